//! Order Model

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order status
///
/// Transitions are monotonic:
/// `pending_shipment → completed`, `pending_shipment → refunded`,
/// `completed → refunded`. A refunded order never changes again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    PendingShipment,
    Completed,
    Refunded,
}

impl OrderStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::PendingShipment => "pending_shipment",
            Self::Completed => "completed",
            Self::Refunded => "refunded",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "completed" => Self::Completed,
            "refunded" => Self::Refunded,
            _ => Self::PendingShipment,
        }
    }

    /// Whether a transition from `self` to `to` is allowed
    pub fn can_transition(&self, to: OrderStatus) -> bool {
        match (self, to) {
            (Self::PendingShipment, Self::Completed) => true,
            (Self::PendingShipment, Self::Refunded) => true,
            (Self::Completed, Self::Refunded) => true,
            _ => false,
        }
    }
}

/// Structured shipping address captured from the payment processor
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ShippingAddress {
    pub name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

/// Snapshot of one purchased line item
///
/// Carries the price at purchase time, not a live catalog reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLineItem {
    /// Stable catalog reference when the checkout carried it; None for
    /// line items that could not be matched to the catalog
    pub product_id: Option<i64>,
    pub variant: Option<String>,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub shipping_address: ShippingAddress,
    /// Snapshot of the first line item (legacy single-item display shape)
    pub product_id: Option<i64>,
    pub product_name: String,
    pub product_price: Decimal,
    pub quantity: i32,
    /// Full line-item snapshot for multi-item orders
    pub items: Vec<OrderLineItem>,
    pub total_price: Decimal,
    pub currency: String,
    pub stripe_session_id: String,
    /// Idempotency anchor: unique per processor payment
    pub stripe_payment_intent: String,
    pub status: OrderStatus,
    pub tracking_carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub estimated_delivery: Option<NaiveDate>,
    pub completion_notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_monotonic() {
        use OrderStatus::*;
        assert!(PendingShipment.can_transition(Completed));
        assert!(PendingShipment.can_transition(Refunded));
        assert!(Completed.can_transition(Refunded));

        // Refunded is terminal
        assert!(!Refunded.can_transition(Completed));
        assert!(!Refunded.can_transition(PendingShipment));
        assert!(!Refunded.can_transition(Refunded));

        // Completed never goes backwards
        assert!(!Completed.can_transition(PendingShipment));
        assert!(!Completed.can_transition(Completed));
    }

    #[test]
    fn test_status_db_round_trip() {
        for s in [
            OrderStatus::PendingShipment,
            OrderStatus::Completed,
            OrderStatus::Refunded,
        ] {
            assert_eq!(OrderStatus::from_db(s.as_db()), s);
        }
    }

    #[test]
    fn test_status_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::PendingShipment).unwrap(),
            "\"pending_shipment\""
        );
    }
}
