//! Payment processor webhook handler
//!
//! POST /stripe/webhook — raw body, HMAC signature verified.
//!
//! Delivery is at-least-once and unordered, so every branch here is
//! idempotent. Deduplication is keyed on the payment reference inside the
//! order insert itself, not on event ids: a refund that arrives before its
//! completion event must be answered with a retryable status so the
//! processor redelivers it once the order exists.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use crate::db::orders::RefundOutcome;
use crate::reconcile::{self, PaymentCompleted, PaymentRefunded};
use crate::state::AppState;
use crate::stripe;

/// Handle incoming payment processor webhook events
///
/// Must receive the raw body (not JSON) for HMAC signature verification.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let sig_header = match headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    {
        Some(s) => s,
        None => {
            tracing::warn!("Missing Stripe-Signature header");
            return StatusCode::BAD_REQUEST;
        }
    };

    if let Err(e) =
        stripe::verify_webhook_signature(&body, sig_header, &state.stripe_webhook_secret)
    {
        tracing::warn!(error = e, "Webhook signature verification failed");
        return StatusCode::BAD_REQUEST;
    }

    let event: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(%e, "Failed to parse webhook JSON");
            return StatusCode::BAD_REQUEST;
        }
    };

    let event_type = event["type"].as_str().unwrap_or("");
    tracing::info!(event_type = event_type, "Received payment webhook");

    match event_type {
        "checkout.session.completed" => handle_checkout_completed(&state, &event).await,
        "charge.refunded" => handle_charge_refunded(&state, &event).await,
        _ => {
            tracing::debug!(event_type = event_type, "Unhandled webhook event type");
            StatusCode::OK
        }
    }
}

/// checkout.session.completed → create order + decrement stock, once
async fn handle_checkout_completed(state: &AppState, event: &serde_json::Value) -> StatusCode {
    let obj = match event.get("data").and_then(|d| d.get("object")) {
        Some(o) => o,
        None => return StatusCode::OK,
    };

    let completed = match PaymentCompleted::from_session(obj) {
        Some(c) => c,
        None => {
            tracing::warn!("checkout.session.completed missing session id or payment reference");
            return StatusCode::OK;
        }
    };

    // The event payload omits line items; fetch them from the processor.
    let line_items = match stripe::fetch_session_line_items(
        &state.http,
        &state.stripe_secret_key,
        &completed.session_id,
    )
    .await
    {
        Ok(items) => items,
        Err(e) => {
            // Retryable: the processor will redeliver and nothing was written.
            tracing::error!(session_id = %completed.session_id, "Line item fetch failed: {e}");
            return StatusCode::SERVICE_UNAVAILABLE;
        }
    };

    match reconcile::apply_completed(state, &completed, &line_items).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::error!(
                payment_intent = %completed.payment_intent,
                "Failed to apply completion event: {e}"
            );
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// charge.refunded → monotonic refund transition
async fn handle_charge_refunded(state: &AppState, event: &serde_json::Value) -> StatusCode {
    let obj = match event.get("data").and_then(|d| d.get("object")) {
        Some(o) => o,
        None => return StatusCode::OK,
    };

    let refunded = match PaymentRefunded::from_charge(obj, event["created"].as_i64()) {
        Some(r) => r,
        None => {
            tracing::warn!("charge.refunded missing payment reference");
            return StatusCode::OK;
        }
    };

    match reconcile::apply_refunded(state, &refunded).await {
        Ok(RefundOutcome::Applied { .. }) | Ok(RefundOutcome::AlreadyRefunded) => StatusCode::OK,
        // Refund arrived before its completion event; ask for redelivery.
        Ok(RefundOutcome::NoMatchingOrder) => StatusCode::SERVICE_UNAVAILABLE,
        Err(e) => {
            tracing::error!(
                payment_intent = %refunded.payment_intent,
                "Failed to apply refund event: {e}"
            );
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
