//! Payment event reconciliation
//!
//! Translates untrusted, retryable, possibly-reordered payment processor
//! notifications into exactly-once order state changes and exactly-once
//! inventory decrements. The idempotency anchor is the payment reference:
//! the orders table enforces one row per `stripe_payment_intent`, and the
//! order insert plus all stock decrements share one transaction.

pub mod sweep;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::models::order::{OrderLineItem, ShippingAddress};
use shared::util::from_minor_units;

use crate::db::orders::{self, NewOrder, RefundOutcome};
use crate::db::products;
use crate::email;
use crate::error::ServiceResult;
use crate::state::AppState;
use crate::stripe::MetadataItem;

/// A `checkout.session.completed` notification, decoded
#[derive(Debug, Clone)]
pub struct PaymentCompleted {
    pub session_id: String,
    pub payment_intent: String,
    pub amount_total: Decimal,
    pub currency: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub shipping_address: ShippingAddress,
    /// Per-item snapshot carried in the session metadata, when present
    pub metadata_items: Option<Vec<MetadataItem>>,
}

impl PaymentCompleted {
    /// Decode a checkout session object from the webhook payload.
    ///
    /// Returns `None` when the object is missing the fields the reconciler
    /// cannot proceed without (session id, payment reference).
    pub fn from_session(session: &serde_json::Value) -> Option<Self> {
        let session_id = session["id"].as_str()?.to_string();
        let payment_intent = session["payment_intent"].as_str()?.to_string();

        let customer = &session["customer_details"];
        let shipping = session
            .get("shipping_details")
            .filter(|v| !v.is_null())
            .unwrap_or(&session["customer_details"]);
        let address = &shipping["address"];

        let customer_name = customer["name"]
            .as_str()
            .or_else(|| shipping["name"].as_str())
            .unwrap_or("Guest")
            .to_string();
        let customer_email = customer["email"]
            .as_str()
            .or_else(|| session["customer_email"].as_str())
            .unwrap_or("unknown@email.invalid")
            .to_string();
        let customer_phone = customer["phone"].as_str().map(String::from);

        let shipping_address = ShippingAddress {
            name: shipping["name"]
                .as_str()
                .unwrap_or(&customer_name)
                .to_string(),
            line1: address["line1"].as_str().unwrap_or("").to_string(),
            line2: address["line2"].as_str().unwrap_or("").to_string(),
            city: address["city"].as_str().unwrap_or("").to_string(),
            state: address["state"].as_str().unwrap_or("").to_string(),
            postal_code: address["postal_code"].as_str().unwrap_or("").to_string(),
            country: address["country"].as_str().unwrap_or("").to_string(),
        };

        let metadata_items = session["metadata"]["items"]
            .as_str()
            .and_then(crate::stripe::decode_items_metadata);

        Some(Self {
            session_id,
            payment_intent,
            amount_total: from_minor_units(session["amount_total"].as_i64().unwrap_or(0)),
            currency: session["currency"].as_str().unwrap_or("usd").to_string(),
            customer_name,
            customer_email,
            customer_phone,
            shipping_address,
            metadata_items,
        })
    }
}

/// A `charge.refunded` notification, decoded
#[derive(Debug, Clone)]
pub struct PaymentRefunded {
    pub payment_intent: String,
    pub refunded_at: DateTime<Utc>,
}

impl PaymentRefunded {
    /// Decode a refunded charge object.
    ///
    /// The charge's own `created` is the purchase time, not the refund
    /// time: the refund time comes from the newest entry in the charge's
    /// refund list, then the event timestamp, then the current time.
    pub fn from_charge(charge: &serde_json::Value, event_created: Option<i64>) -> Option<Self> {
        let payment_intent = charge["payment_intent"].as_str()?.to_string();
        let refund_ts = charge["refunds"]["data"]
            .as_array()
            .and_then(|refunds| refunds.iter().filter_map(|r| r["created"].as_i64()).max())
            .or(event_created);
        let refunded_at = refund_ts
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .unwrap_or_else(Utc::now);
        Some(Self {
            payment_intent,
            refunded_at,
        })
    }
}

/// Zip processor line items with the per-item metadata snapshot.
///
/// Line items supply the billed name/price/quantity; metadata supplies the
/// stable product id and variant. When the metadata is absent or does not
/// line up (legacy sessions, tampering), items fall back to id-less
/// snapshots that can only be name-matched.
pub fn merge_line_items(
    line_items: &[(String, i32, i64)],
    metadata: Option<&[MetadataItem]>,
) -> Vec<OrderLineItem> {
    let metadata = match metadata {
        Some(m) if m.len() == line_items.len() => Some(m),
        Some(m) => {
            tracing::warn!(
                metadata_len = m.len(),
                line_items_len = line_items.len(),
                "Session metadata does not match line items, ignoring it"
            );
            None
        }
        None => None,
    };

    line_items
        .iter()
        .enumerate()
        .map(|(i, (name, quantity, unit_amount))| {
            let meta = metadata.map(|m| &m[i]);
            OrderLineItem {
                product_id: meta.map(|m| m.product_id),
                variant: meta.and_then(|m| m.variant.clone()),
                name: name.clone(),
                unit_price: from_minor_units(*unit_amount),
                quantity: *quantity,
            }
        })
        .collect()
}

/// Outcome of applying a completion event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Order created and inventory decremented
    Created { order_id: i64 },
    /// An order for this payment reference already exists; replay is a no-op
    AlreadyProcessed,
    /// The session carried no line items; acknowledged without an order so
    /// the processor stops redelivering an unfulfillable event
    NoLineItems,
}

/// Apply a `PaymentCompleted` event: create the order and decrement stock,
/// exactly once per payment reference.
///
/// Safe to re-invoke with the same event: the insert-first idempotency
/// guard means a retry after a transient failure never double-decrements.
/// Confirmation emails are fire-and-forget and never roll anything back.
pub async fn apply_completed(
    state: &AppState,
    event: &PaymentCompleted,
    line_items: &[(String, i32, i64)],
) -> ServiceResult<CompletionOutcome> {
    if line_items.is_empty() {
        tracing::warn!(
            session_id = %event.session_id,
            payment_intent = %event.payment_intent,
            "Completion event has no line items, acknowledging without an order"
        );
        return Ok(CompletionOutcome::NoLineItems);
    }

    let mut tx = state.pool.begin().await?;

    // Resolve catalog products inside the transaction so the recorded
    // snapshot and the decrements agree on what matched.
    let mut items = merge_line_items(line_items, event.metadata_items.as_deref());
    for item in &mut items {
        if item.product_id.is_none() {
            item.product_id = products::find_id_by_name(&mut tx, &item.name).await?;
            if item.product_id.is_none() {
                tracing::warn!(
                    line_item = %item.name,
                    payment_intent = %event.payment_intent,
                    "Line item matches no catalog product; recorded without inventory decrement"
                );
            }
        }
    }

    let new_order = NewOrder {
        customer_name: event.customer_name.clone(),
        customer_email: event.customer_email.clone(),
        customer_phone: event.customer_phone.clone(),
        shipping_address: event.shipping_address.clone(),
        items: items.clone(),
        total_price: event.amount_total,
        currency: event.currency.clone(),
        stripe_session_id: event.session_id.clone(),
        stripe_payment_intent: event.payment_intent.clone(),
    };

    let order_id = match orders::insert_completed(&mut tx, &new_order).await? {
        Some(id) => id,
        None => {
            // Duplicate delivery: another invocation already owns this
            // payment reference. Nothing was decremented in this tx.
            tx.rollback().await?;
            tracing::info!(
                payment_intent = %event.payment_intent,
                "Completion event already processed, skipping"
            );
            return Ok(CompletionOutcome::AlreadyProcessed);
        }
    };

    for item in &items {
        let Some(product_id) = item.product_id else {
            continue;
        };
        match &item.variant {
            Some(variant) => {
                products::decrement_variant_stock(&mut tx, product_id, variant, item.quantity)
                    .await?
            }
            None => products::decrement_stock(&mut tx, product_id, item.quantity).await?,
        }
    }

    tx.commit().await?;

    tracing::info!(
        order_id,
        payment_intent = %event.payment_intent,
        total = %event.amount_total,
        "Order created from completion event"
    );

    // Best-effort side effects: failure is logged inside the email module
    // and never affects the committed order.
    let order = orders::get_order(&state.pool, order_id).await?;
    {
        let state = state.clone();
        let order = order.clone();
        tokio::spawn(async move {
            email::send_order_confirmation(&state, &order).await;
            email::send_admin_new_order(&state, &order).await;
        });
    }

    Ok(CompletionOutcome::Created { order_id })
}

/// Apply a `PaymentRefunded` event: idempotent monotonic transition.
///
/// A refund with no matching order (delivered before the completion event)
/// is reported as [`RefundOutcome::NoMatchingOrder`]; the webhook surface
/// answers with a retryable status so the processor redelivers, and the
/// compensating sweep re-applies the refund once the order exists.
pub async fn apply_refunded(
    state: &AppState,
    event: &PaymentRefunded,
) -> ServiceResult<RefundOutcome> {
    let outcome = orders::mark_refunded(&state.pool, &event.payment_intent, event.refunded_at).await?;

    match &outcome {
        RefundOutcome::Applied { order_id } => {
            tracing::info!(order_id, payment_intent = %event.payment_intent, "Order refunded");
        }
        RefundOutcome::AlreadyRefunded => {
            tracing::info!(
                payment_intent = %event.payment_intent,
                "Refund event already applied, skipping"
            );
        }
        RefundOutcome::NoMatchingOrder => {
            tracing::warn!(
                payment_intent = %event.payment_intent,
                "Refund event for unknown payment reference, requesting redelivery"
            );
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session_fixture() -> serde_json::Value {
        json!({
            "id": "cs_test_123",
            "payment_intent": "pi_test_456",
            "amount_total": 2000,
            "currency": "usd",
            "customer_details": {
                "name": "Ada Lovelace",
                "email": "ada@example.com",
                "phone": "+15555550123"
            },
            "shipping_details": {
                "name": "Ada Lovelace",
                "address": {
                    "line1": "1 Analytical Way",
                    "city": "London",
                    "postal_code": "N1 9GU",
                    "country": "GB"
                }
            },
            "metadata": {
                "items": "[{\"p\":7,\"q\":2}]"
            }
        })
    }

    #[test]
    fn test_parse_completed_session() {
        let event = PaymentCompleted::from_session(&session_fixture()).unwrap();
        assert_eq!(event.session_id, "cs_test_123");
        assert_eq!(event.payment_intent, "pi_test_456");
        assert_eq!(event.amount_total, "20.00".parse().unwrap());
        assert_eq!(event.customer_name, "Ada Lovelace");
        assert_eq!(event.customer_email, "ada@example.com");
        assert_eq!(event.customer_phone.as_deref(), Some("+15555550123"));
        assert_eq!(event.shipping_address.line1, "1 Analytical Way");
        assert_eq!(event.shipping_address.country, "GB");

        let meta = event.metadata_items.unwrap();
        assert_eq!(meta.len(), 1);
        assert_eq!(meta[0].product_id, 7);
        assert_eq!(meta[0].quantity, 2);
    }

    #[test]
    fn test_parse_session_missing_payment_intent() {
        let mut session = session_fixture();
        session["payment_intent"] = serde_json::Value::Null;
        assert!(PaymentCompleted::from_session(&session).is_none());
    }

    #[test]
    fn test_parse_session_without_metadata_or_shipping() {
        let session = json!({
            "id": "cs_1",
            "payment_intent": "pi_1",
            "amount_total": 999,
            "currency": "usd",
            "customer_details": { "name": "Bob", "email": "bob@example.com" }
        });
        let event = PaymentCompleted::from_session(&session).unwrap();
        assert!(event.metadata_items.is_none());
        assert_eq!(event.shipping_address.name, "Bob");
        assert_eq!(event.amount_total, "9.99".parse().unwrap());
    }

    #[test]
    fn test_refund_time_comes_from_newest_refund_not_charge_creation() {
        // Charge created at purchase time, refunded weeks later.
        let charge = json!({
            "id": "ch_1",
            "payment_intent": "pi_test_456",
            "refunded": true,
            "created": 1_700_000_000,
            "refunds": {
                "data": [
                    { "id": "re_1", "created": 1_701_000_000 },
                    { "id": "re_2", "created": 1_702_000_000 }
                ]
            }
        });
        let event = PaymentRefunded::from_charge(&charge, Some(1_702_000_100)).unwrap();
        assert_eq!(event.payment_intent, "pi_test_456");
        assert_eq!(event.refunded_at.timestamp(), 1_702_000_000);
    }

    #[test]
    fn test_refund_time_falls_back_to_event_timestamp() {
        let charge = json!({
            "id": "ch_1",
            "payment_intent": "pi_test_456",
            "refunded": true,
            "created": 1_700_000_000
        });
        let event = PaymentRefunded::from_charge(&charge, Some(1_702_000_000)).unwrap();
        assert_eq!(event.refunded_at.timestamp(), 1_702_000_000);
    }

    #[test]
    fn test_refunded_charge_without_reference_is_none() {
        assert!(PaymentRefunded::from_charge(&json!({"id": "ch_1"}), None).is_none());
    }

    #[test]
    fn test_merge_uses_metadata_ids() {
        let line_items = vec![
            ("Phone (128GB)".to_string(), 1, 49999_i64),
            ("Case".to_string(), 2, 1999_i64),
        ];
        let metadata = vec![
            MetadataItem {
                product_id: 7,
                variant: Some("128GB".into()),
                quantity: 1,
            },
            MetadataItem {
                product_id: 9,
                variant: None,
                quantity: 2,
            },
        ];
        let items = merge_line_items(&line_items, Some(&metadata));
        assert_eq!(items[0].product_id, Some(7));
        assert_eq!(items[0].variant.as_deref(), Some("128GB"));
        assert_eq!(items[0].unit_price, "499.99".parse().unwrap());
        assert_eq!(items[1].product_id, Some(9));
        assert_eq!(items[1].quantity, 2);
    }

    #[test]
    fn test_merge_ignores_mismatched_metadata() {
        let line_items = vec![("Phone".to_string(), 1, 1000_i64)];
        let metadata = vec![
            MetadataItem {
                product_id: 7,
                variant: None,
                quantity: 1,
            },
            MetadataItem {
                product_id: 9,
                variant: None,
                quantity: 1,
            },
        ];
        let items = merge_line_items(&line_items, Some(&metadata));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product_id, None);
        assert_eq!(items[0].name, "Phone");
    }

    // Lazy pool, never connected: the empty-items path returns before any
    // query runs.
    fn test_state() -> AppState {
        AppState {
            pool: sqlx::PgPool::connect_lazy("postgres://localhost/unused").unwrap(),
            http: reqwest::Client::new(),
            stripe_secret_key: "sk_test".into(),
            stripe_webhook_secret: "whsec_test".into(),
            checkout_success_url: "http://localhost/success".into(),
            checkout_cancel_url: "http://localhost/cancel".into(),
            resend_api_key: "re_test".into(),
            email_from: "shop@example.com".into(),
            admin_email: "admin@example.com".into(),
            identity_provider_url: "http://localhost/verify".into(),
            blob_store_url: "http://localhost/blob".into(),
            blob_public_base_url: "http://localhost/public".into(),
            sessions: crate::auth::SessionCache::new(),
        }
    }

    #[tokio::test]
    async fn test_completion_without_line_items_is_acknowledged() {
        let event = PaymentCompleted::from_session(&session_fixture()).unwrap();
        let outcome = apply_completed(&test_state(), &event, &[]).await.unwrap();
        assert_eq!(outcome, CompletionOutcome::NoLineItems);
    }

    #[test]
    fn test_merge_without_metadata() {
        let line_items = vec![("Phone".to_string(), 3, 500_i64)];
        let items = merge_line_items(&line_items, None);
        assert_eq!(items[0].product_id, None);
        assert_eq!(items[0].quantity, 3);
        assert_eq!(items[0].unit_price, "5.00".parse().unwrap());
    }
}
