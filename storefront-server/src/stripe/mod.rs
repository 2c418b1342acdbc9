//! Stripe integration via REST API (no SDK dependency)

use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One line item of a checkout session request
#[derive(Debug, Clone)]
pub struct CheckoutLineItem {
    pub product_id: i64,
    pub variant: Option<String>,
    pub name: String,
    pub description: String,
    pub image: Option<String>,
    /// Unit amount in minor units (integer cents)
    pub unit_amount: i64,
    pub quantity: i32,
}

/// Compact per-item snapshot carried in the session metadata.
///
/// This is how the stable product id survives the round trip through the
/// payment processor: the webhook reads it back instead of matching line
/// items to the catalog by display name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetadataItem {
    #[serde(rename = "p")]
    pub product_id: i64,
    #[serde(rename = "v", skip_serializing_if = "Option::is_none", default)]
    pub variant: Option<String>,
    #[serde(rename = "q")]
    pub quantity: i32,
}

/// Created checkout session handle
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Encode the per-item metadata for a session (JSON array, compact keys).
pub fn encode_items_metadata(items: &[CheckoutLineItem]) -> Result<String, serde_json::Error> {
    let compact: Vec<MetadataItem> = items
        .iter()
        .map(|i| MetadataItem {
            product_id: i.product_id,
            variant: i.variant.clone(),
            quantity: i.quantity,
        })
        .collect();
    serde_json::to_string(&compact)
}

/// Decode the per-item metadata from a session, if present and well-formed.
pub fn decode_items_metadata(raw: &str) -> Option<Vec<MetadataItem>> {
    serde_json::from_str(raw).ok()
}

/// Stripe caps each metadata value at 500 characters.
const METADATA_VALUE_MAX: usize = 500;

/// Per-item metadata value for a session, or `None` when the encoded form
/// exceeds the processor's per-value cap. A session without the metadata is
/// still valid; the webhook falls back to name matching.
pub fn items_metadata_value(
    items: &[CheckoutLineItem],
) -> Result<Option<String>, serde_json::Error> {
    let encoded = encode_items_metadata(items)?;
    if encoded.len() > METADATA_VALUE_MAX {
        tracing::warn!(
            items = items.len(),
            encoded_len = encoded.len(),
            "Cart metadata exceeds the processor value cap, omitting stable ids"
        );
        return Ok(None);
    }
    Ok(Some(encoded))
}

/// Create a Stripe Checkout Session (payment mode)
///
/// Collects shipping address (US/CA), billing address and phone number.
/// The per-item product ids are embedded in the session metadata so the
/// completion webhook can resolve catalog products by stable id.
pub async fn create_checkout_session(
    http: &reqwest::Client,
    secret_key: &str,
    currency: &str,
    items: &[CheckoutLineItem],
    success_url: &str,
    cancel_url: &str,
) -> Result<CheckoutSession, BoxError> {
    let mut form: Vec<(String, String)> = vec![
        ("mode".into(), "payment".into()),
        ("payment_method_types[0]".into(), "card".into()),
        ("success_url".into(), success_url.into()),
        ("cancel_url".into(), cancel_url.into()),
        (
            "shipping_address_collection[allowed_countries][0]".into(),
            "US".into(),
        ),
        (
            "shipping_address_collection[allowed_countries][1]".into(),
            "CA".into(),
        ),
        ("billing_address_collection".into(), "required".into()),
        ("phone_number_collection[enabled]".into(), "true".into()),
    ];

    if let Some(value) = items_metadata_value(items)? {
        form.push(("metadata[items]".into(), value));
    }

    for (i, item) in items.iter().enumerate() {
        form.push((
            format!("line_items[{i}][price_data][currency]"),
            currency.into(),
        ));
        form.push((
            format!("line_items[{i}][price_data][unit_amount]"),
            item.unit_amount.to_string(),
        ));
        let display_name = match &item.variant {
            Some(v) => format!("{} ({v})", item.name),
            None => item.name.clone(),
        };
        form.push((
            format!("line_items[{i}][price_data][product_data][name]"),
            display_name,
        ));
        if !item.description.is_empty() {
            form.push((
                format!("line_items[{i}][price_data][product_data][description]"),
                item.description.clone(),
            ));
        }
        if let Some(image) = &item.image {
            form.push((
                format!("line_items[{i}][price_data][product_data][images][0]"),
                image.clone(),
            ));
        }
        form.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
    }

    let resp: serde_json::Value = http
        .post("https://api.stripe.com/v1/checkout/sessions")
        .basic_auth(secret_key, None::<&str>)
        .form(&form)
        .send()
        .await?
        .json()
        .await?;

    match (resp["id"].as_str(), resp["url"].as_str()) {
        (Some(id), Some(url)) => Ok(CheckoutSession {
            id: id.to_string(),
            url: url.to_string(),
        }),
        _ => Err(format!("Stripe create_checkout failed: {resp}").into()),
    }
}

/// Current status of a payment, as reported by the processor
#[derive(Debug, Clone)]
pub struct PaymentStatus {
    pub status: String,
    pub refunded: bool,
    pub amount: Decimal,
}

/// Poll the processor for the current status of a payment.
///
/// Reports whether any associated charge has been refunded; used by the
/// compensating refund sweep to catch webhook deliveries that were missed.
pub async fn fetch_payment_status(
    http: &reqwest::Client,
    secret_key: &str,
    payment_intent: &str,
) -> Result<PaymentStatus, BoxError> {
    let resp: serde_json::Value = http
        .get(format!(
            "https://api.stripe.com/v1/payment_intents/{payment_intent}"
        ))
        .basic_auth(secret_key, None::<&str>)
        .query(&[("expand[]", "charges")])
        .send()
        .await?
        .json()
        .await?;

    let status = resp["status"]
        .as_str()
        .ok_or_else(|| format!("Stripe payment_intent fetch failed: {resp}"))?
        .to_string();

    let refunded = resp["charges"]["data"]
        .as_array()
        .map(|charges| {
            charges.iter().any(|c| {
                c["refunded"].as_bool().unwrap_or(false)
                    || c["amount_refunded"].as_i64().unwrap_or(0) > 0
            })
        })
        .unwrap_or(false);

    let amount = shared::util::from_minor_units(resp["amount"].as_i64().unwrap_or(0));

    Ok(PaymentStatus {
        status,
        refunded,
        amount,
    })
}

/// Fetch the line items of a checkout session.
///
/// The completion event omits them, so the reconciler fetches them here
/// before matching against the session metadata.
pub async fn fetch_session_line_items(
    http: &reqwest::Client,
    secret_key: &str,
    session_id: &str,
) -> Result<Vec<(String, i32, i64)>, BoxError> {
    let resp: serde_json::Value = http
        .get(format!(
            "https://api.stripe.com/v1/checkout/sessions/{session_id}/line_items"
        ))
        .basic_auth(secret_key, None::<&str>)
        .send()
        .await?
        .json()
        .await?;

    let data = resp["data"]
        .as_array()
        .ok_or_else(|| format!("Stripe line_items fetch failed: {resp}"))?;

    Ok(data
        .iter()
        .map(|item| {
            (
                item["description"].as_str().unwrap_or("").to_string(),
                item["quantity"].as_i64().unwrap_or(1) as i32,
                item["price"]["unit_amount"].as_i64().unwrap_or(0),
            )
        })
        .collect())
}

/// Verify Stripe webhook signature (HMAC-SHA256)
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
) -> Result<(), &'static str> {
    let mut timestamp = "";
    let mut signature = "";
    for part in sig_header.split(',') {
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signature = v;
        }
    }

    if timestamp.is_empty() || signature.is_empty() {
        return Err("Invalid Stripe-Signature header");
    }

    let signed_payload = format!("{timestamp}.{}", std::str::from_utf8(payload).unwrap_or(""));
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(signed_payload.as_bytes());

    // Decode hex signature and use constant-time comparison via hmac::verify_slice
    let sig_bytes = hex::decode(signature).map_err(|_| "Invalid signature hex")?;
    mac.verify_slice(&sig_bytes)
        .map_err(|_| "Webhook signature mismatch")?;

    // Reject events older than 5 minutes to prevent replay attacks
    let ts: i64 = timestamp.parse().map_err(|_| "Invalid timestamp")?;
    let now = chrono::Utc::now().timestamp();
    if (now - ts).abs() > 300 {
        return Err("Webhook timestamp too old");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(payload: &[u8], secret: &str, ts: i64) -> String {
        let signed_payload = format!("{ts}.{}", std::str::from_utf8(payload).unwrap());
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed_payload.as_bytes());
        let sig = hex::encode(mac.finalize().into_bytes());
        format!("t={ts},v1={sig}")
    }

    #[test]
    fn test_valid_signature_accepted() {
        let payload = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;
        let secret = "whsec_test";
        let header = sign(payload, secret, chrono::Utc::now().timestamp());
        assert!(verify_webhook_signature(payload, &header, secret).is_ok());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign(payload, "whsec_other", chrono::Utc::now().timestamp());
        assert!(verify_webhook_signature(payload, &header, "whsec_test").is_err());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let secret = "whsec_test";
        let header = sign(br#"{"amount":100}"#, secret, chrono::Utc::now().timestamp());
        assert!(verify_webhook_signature(br#"{"amount":999}"#, &header, secret).is_err());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let payload = br#"{"id":"evt_1"}"#;
        let secret = "whsec_test";
        let header = sign(payload, secret, chrono::Utc::now().timestamp() - 600);
        assert_eq!(
            verify_webhook_signature(payload, &header, secret),
            Err("Webhook timestamp too old")
        );
    }

    #[test]
    fn test_malformed_header_rejected() {
        assert!(verify_webhook_signature(b"{}", "garbage", "whsec_test").is_err());
        assert!(verify_webhook_signature(b"{}", "t=123", "whsec_test").is_err());
    }

    #[test]
    fn test_items_metadata_round_trip() {
        let items = vec![
            CheckoutLineItem {
                product_id: 7,
                variant: Some("128GB".into()),
                name: "Phone".into(),
                description: String::new(),
                image: None,
                unit_amount: 49999,
                quantity: 1,
            },
            CheckoutLineItem {
                product_id: 9,
                variant: None,
                name: "Case".into(),
                description: String::new(),
                image: None,
                unit_amount: 1999,
                quantity: 2,
            },
        ];
        let raw = encode_items_metadata(&items).unwrap();
        let decoded = decode_items_metadata(&raw).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].product_id, 7);
        assert_eq!(decoded[0].variant.as_deref(), Some("128GB"));
        assert_eq!(decoded[1].quantity, 2);
        assert_eq!(decoded[1].variant, None);
    }

    #[test]
    fn test_small_cart_metadata_included() {
        let items = vec![CheckoutLineItem {
            product_id: 7,
            variant: None,
            name: "Phone".into(),
            description: String::new(),
            image: None,
            unit_amount: 49999,
            quantity: 1,
        }];
        assert!(items_metadata_value(&items).unwrap().is_some());
    }

    #[test]
    fn test_oversized_cart_metadata_omitted() {
        let items: Vec<CheckoutLineItem> = (0..40)
            .map(|i| CheckoutLineItem {
                product_id: i,
                variant: Some(format!("variant-{i}")),
                name: format!("Product {i}"),
                description: String::new(),
                image: None,
                unit_amount: 1000,
                quantity: 1,
            })
            .collect();
        assert!(encode_items_metadata(&items).unwrap().len() > METADATA_VALUE_MAX);
        assert!(items_metadata_value(&items).unwrap().is_none());
    }

    #[test]
    fn test_items_metadata_garbage_is_none() {
        assert!(decode_items_metadata("not json").is_none());
        assert!(decode_items_metadata(r#"{"p":1}"#).is_none());
    }
}
