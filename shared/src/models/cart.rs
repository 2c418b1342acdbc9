//! Cart Snapshot
//!
//! The browser cart is client-held; the server only ever sees it as an
//! ordered list of line items at checkout time. The price snapshot taken
//! at add-to-cart time is advisory, never authoritative for billing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One line item of the client cart snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: i64,
    /// Selected variant name, when the product has variants
    pub variant: Option<String>,
    pub quantity: i32,
    /// Price captured at add-to-cart time; display only
    pub unit_price_snapshot: Decimal,
}
