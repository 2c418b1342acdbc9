//! Product Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product visibility status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Active,
    Draft,
}

impl ProductStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Draft => "draft",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "draft" => Self::Draft,
            _ => Self::Active,
        }
    }
}

/// Product variant with independent price and inventory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Variant {
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub track_inventory: bool,
}

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Authoritative price for products without variants
    pub price: Decimal,
    /// Authoritative only when `track_inventory` is true and no variants exist
    pub stock: i32,
    pub track_inventory: bool,
    /// Ordered variant list; each variant tracks its own inventory
    pub variants: Vec<Variant>,
    /// Ordered image URLs; first is the primary image
    pub images: Vec<String>,
    /// Category references for filtering
    pub category_ids: Vec<i64>,
    /// Tag references for filtering
    pub tag_ids: Vec<i64>,
    pub status: ProductStatus,
    /// Soft-delete marker; deleted products stay for order history
    pub deleted: bool,
    pub is_featured: bool,
    /// Dense rank among featured products (1..=3) when `is_featured`
    pub featured_rank: Option<i32>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: Option<i32>,
    pub track_inventory: Option<bool>,
    pub variants: Option<Vec<Variant>>,
    pub images: Option<Vec<String>>,
    pub category_ids: Option<Vec<i64>>,
    pub tag_ids: Option<Vec<i64>>,
    pub status: Option<ProductStatus>,
}

/// Update product payload (all fields optional)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub track_inventory: Option<bool>,
    pub variants: Option<Vec<Variant>>,
    pub images: Option<Vec<String>>,
    pub category_ids: Option<Vec<i64>>,
    pub tag_ids: Option<Vec<i64>>,
    pub status: Option<ProductStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_db_round_trip() {
        assert_eq!(ProductStatus::Active.as_db(), "active");
        assert_eq!(ProductStatus::Draft.as_db(), "draft");
        assert_eq!(ProductStatus::from_db("draft"), ProductStatus::Draft);
        assert_eq!(ProductStatus::from_db("active"), ProductStatus::Active);
    }

    #[test]
    fn test_status_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&ProductStatus::Draft).unwrap(),
            "\"draft\""
        );
    }
}
