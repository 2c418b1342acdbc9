//! Transactional email via the Resend REST API
//!
//! Emails are best-effort side effects: every `send_*` helper logs its own
//! failure and returns nothing, so callers never couple order state to
//! mail delivery.

use serde_json::json;
use shared::models::order::Order;

use crate::state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

async fn deliver(
    state: &AppState,
    to: &str,
    subject: &str,
    html: String,
) -> Result<(), BoxError> {
    let resp = state
        .http
        .post("https://api.resend.com/emails")
        .bearer_auth(&state.resend_api_key)
        .json(&json!({
            "from": &state.email_from,
            "to": [to],
            "subject": subject,
            "html": html,
        }))
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(format!("Resend returned {status}: {body}").into());
    }

    Ok(())
}

fn items_table_html(order: &Order) -> String {
    let mut rows = String::new();
    for item in &order.items {
        let name = match &item.variant {
            Some(v) => format!("{} ({})", item.name, v),
            None => item.name.clone(),
        };
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>${}</td></tr>",
            name, item.quantity, item.unit_price
        ));
    }
    format!(
        "<table><tr><th>Item</th><th>Qty</th><th>Price</th></tr>{rows}\
         <tr><td colspan=\"2\"><strong>Total</strong></td>\
         <td><strong>${}</strong></td></tr></table>",
        order.total_price
    )
}

pub fn order_confirmation_html(order: &Order) -> String {
    let addr = &order.shipping_address;
    format!(
        "<h1>Thank you for your order!</h1>\
         <p>Hi {name}, we received your order #{id} and will ship it shortly.</p>\
         {items}\
         <h3>Shipping to</h3>\
         <p>{addr_name}<br>{line1}<br>{city}, {state} {postal}<br>{country}</p>",
        name = order.customer_name,
        id = order.id,
        items = items_table_html(order),
        addr_name = addr.name,
        line1 = addr.line1,
        city = addr.city,
        state = addr.state,
        postal = addr.postal_code,
        country = addr.country,
    )
}

pub fn admin_new_order_html(order: &Order) -> String {
    format!(
        "<h1>New order #{id}</h1>\
         <p>{name} &lt;{email}&gt; placed an order for ${total}.</p>\
         {items}",
        id = order.id,
        name = order.customer_name,
        email = order.customer_email,
        total = order.total_price,
        items = items_table_html(order),
    )
}

pub fn shipping_notification_html(order: &Order) -> String {
    let mut tracking = String::new();
    if let Some(carrier) = &order.tracking_carrier {
        tracking.push_str(&format!("<p>Carrier: {carrier}</p>"));
    }
    if let Some(number) = &order.tracking_number {
        match &order.tracking_url {
            Some(url) => tracking.push_str(&format!(
                "<p>Tracking number: <a href=\"{url}\">{number}</a></p>"
            )),
            None => tracking.push_str(&format!("<p>Tracking number: {number}</p>")),
        }
    }
    if let Some(eta) = order.estimated_delivery {
        tracking.push_str(&format!("<p>Estimated delivery: {eta}</p>"));
    }
    format!(
        "<h1>Your order is on the way!</h1>\
         <p>Hi {name}, your order #{id} has shipped.</p>\
         {tracking}\
         {items}",
        name = order.customer_name,
        id = order.id,
        items = items_table_html(order),
    )
}

pub async fn send_order_confirmation(state: &AppState, order: &Order) {
    let html = order_confirmation_html(order);
    let subject = format!("Order confirmation #{}", order.id);
    match deliver(state, &order.customer_email, &subject, html).await {
        Ok(()) => tracing::info!(order_id = order.id, to = %order.customer_email, "Order confirmation sent"),
        Err(e) => tracing::warn!(order_id = order.id, "Failed to send order confirmation: {e}"),
    }
}

pub async fn send_admin_new_order(state: &AppState, order: &Order) {
    let html = admin_new_order_html(order);
    let subject = format!("New order #{} (${})", order.id, order.total_price);
    match deliver(state, &state.admin_email, &subject, html).await {
        Ok(()) => tracing::info!(order_id = order.id, "Admin notification sent"),
        Err(e) => tracing::warn!(order_id = order.id, "Failed to send admin notification: {e}"),
    }
}

pub async fn send_shipping_notification(state: &AppState, order: &Order) {
    let html = shipping_notification_html(order);
    let subject = format!("Your order #{} has shipped", order.id);
    match deliver(state, &order.customer_email, &subject, html).await {
        Ok(()) => tracing::info!(order_id = order.id, to = %order.customer_email, "Shipping notification sent"),
        Err(e) => tracing::warn!(order_id = order.id, "Failed to send shipping notification: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::models::order::{OrderLineItem, OrderStatus, ShippingAddress};

    fn order_fixture() -> Order {
        Order {
            id: 42,
            customer_name: "Ada Lovelace".into(),
            customer_email: "ada@example.com".into(),
            customer_phone: None,
            shipping_address: ShippingAddress {
                name: "Ada Lovelace".into(),
                line1: "1 Analytical Way".into(),
                line2: String::new(),
                city: "London".into(),
                state: String::new(),
                postal_code: "N1 9GU".into(),
                country: "GB".into(),
            },
            product_id: Some(7),
            product_name: "Phone".into(),
            product_price: "499.99".parse().unwrap(),
            quantity: 1,
            items: vec![OrderLineItem {
                product_id: Some(7),
                variant: Some("128GB".into()),
                name: "Phone".into(),
                unit_price: "499.99".parse().unwrap(),
                quantity: 1,
            }],
            total_price: "499.99".parse().unwrap(),
            currency: "usd".into(),
            stripe_session_id: "cs_1".into(),
            stripe_payment_intent: "pi_1".into(),
            status: OrderStatus::PendingShipment,
            tracking_carrier: Some("UPS".into()),
            tracking_number: Some("1Z999".into()),
            tracking_url: Some("https://track.example.com/1Z999".into()),
            estimated_delivery: None,
            completion_notes: None,
            created_at: Utc::now(),
            completed_at: None,
            refunded_at: None,
        }
    }

    #[test]
    fn test_confirmation_includes_items_and_address() {
        let html = order_confirmation_html(&order_fixture());
        assert!(html.contains("order #42"));
        assert!(html.contains("Phone (128GB)"));
        assert!(html.contains("$499.99"));
        assert!(html.contains("1 Analytical Way"));
    }

    #[test]
    fn test_shipping_notification_includes_tracking_link() {
        let html = shipping_notification_html(&order_fixture());
        assert!(html.contains("UPS"));
        assert!(html.contains("https://track.example.com/1Z999"));
        assert!(html.contains("1Z999"));
    }

    #[test]
    fn test_admin_notification_names_customer() {
        let html = admin_new_order_html(&order_fixture());
        assert!(html.contains("Ada Lovelace"));
        assert!(html.contains("ada@example.com"));
    }
}
