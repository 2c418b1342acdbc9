//! Checkout session creation
//!
//! The cart arrives from the browser, so nothing in it is trusted beyond
//! product references and quantities: prices always come from the catalog.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use shared::error::{AppError, ErrorCode};
use shared::models::{CartItem, Product, ProductStatus};
use shared::util::to_minor_units;

use crate::db;
use crate::error::ServiceError;
use crate::state::AppState;
use crate::stripe::{self, CheckoutLineItem};

use super::ApiResult;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CartItem>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: String,
}

/// POST /api/checkout/session
pub async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutRequest>,
) -> ApiResult<CheckoutResponse> {
    let line_items = build_line_items(&state, &payload.items).await?;

    let session = stripe::create_checkout_session(
        &state.http,
        &state.stripe_secret_key,
        "usd",
        &line_items,
        &state.checkout_success_url,
        &state.checkout_cancel_url,
    )
    .await
    .map_err(|e| {
        tracing::error!("Checkout session creation failed: {e}");
        AppError::new(ErrorCode::PaymentProviderError)
    })?;

    tracing::info!(session_id = %session.id, items = line_items.len(), "Checkout session created");

    Ok(Json(CheckoutResponse {
        session_id: session.id,
        url: session.url,
    }))
}

/// Resolve cart entries to priced line items against the live catalog.
async fn build_line_items(
    state: &AppState,
    cart: &[CartItem],
) -> Result<Vec<CheckoutLineItem>, ServiceError> {
    let mut products = Vec::with_capacity(cart.len());
    for entry in cart {
        products.push(db::products::get_product(&state.pool, entry.product_id).await?);
    }
    Ok(price_cart(cart, &products)?)
}

/// Validate and price cart entries; `products[i]` is the catalog row for
/// `cart[i]`.
///
/// Catalog prices are authoritative; the snapshot the browser sent is
/// display-only and ignored here.
fn price_cart(cart: &[CartItem], products: &[Product]) -> Result<Vec<CheckoutLineItem>, AppError> {
    if cart.is_empty() {
        return Err(AppError::new(ErrorCode::CartEmpty));
    }

    let mut line_items = Vec::with_capacity(cart.len());
    for (entry, product) in cart.iter().zip(products) {
        if entry.quantity <= 0 {
            return Err(AppError::validation("Quantity must be positive")
                .with_detail("product_id", entry.product_id));
        }

        if product.status != ProductStatus::Active {
            return Err(
                AppError::new(ErrorCode::ProductNotFound).with_detail("product_id", entry.product_id)
            );
        }

        let price = match &entry.variant {
            Some(name) => {
                product
                    .variants
                    .iter()
                    .find(|v| &v.name == name)
                    .ok_or_else(|| {
                        AppError::new(ErrorCode::VariantNotFound)
                            .with_detail("product_id", entry.product_id)
                            .with_detail("variant", name.clone())
                    })?
                    .price
            }
            None => product.price,
        };

        let unit_amount = to_minor_units(price).ok_or_else(|| {
            AppError::new(ErrorCode::ProductInvalidPrice).with_detail("product_id", product.id)
        })?;

        line_items.push(CheckoutLineItem {
            product_id: product.id,
            variant: entry.variant.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
            image: product.images.first().cloned(),
            unit_amount,
            quantity: entry.quantity,
        });
    }

    Ok(line_items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::Variant;

    fn product(id: i64, price: &str) -> Product {
        Product {
            id,
            name: format!("Product {id}"),
            description: String::new(),
            price: price.parse().unwrap(),
            stock: 10,
            track_inventory: true,
            variants: vec![],
            images: vec![],
            category_ids: vec![],
            tag_ids: vec![],
            status: ProductStatus::Active,
            deleted: false,
            is_featured: false,
            featured_rank: None,
            created_at: chrono::Utc::now(),
        }
    }

    fn cart_entry(product_id: i64, quantity: i32) -> CartItem {
        CartItem {
            product_id,
            variant: None,
            quantity,
            unit_price_snapshot: "1.00".parse().unwrap(),
        }
    }

    #[test]
    fn test_empty_cart_rejected() {
        let err = price_cart(&[], &[]).unwrap_err();
        assert_eq!(err.code, ErrorCode::CartEmpty);
    }

    #[test]
    fn test_nonpositive_quantity_rejected() {
        let err = price_cart(&[cart_entry(1, 0)], &[product(1, "10.00")]).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let err = price_cart(&[cart_entry(1, -2)], &[product(1, "10.00")]).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn test_draft_product_rejected() {
        let mut draft = product(1, "10.00");
        draft.status = ProductStatus::Draft;
        let err = price_cart(&[cart_entry(1, 1)], &[draft]).unwrap_err();
        assert_eq!(err.code, ErrorCode::ProductNotFound);
    }

    #[test]
    fn test_unknown_variant_rejected() {
        let mut phone = product(1, "499.99");
        phone.variants = vec![Variant {
            name: "128GB".into(),
            price: "499.99".parse().unwrap(),
            stock: 5,
            track_inventory: true,
        }];
        let mut entry = cart_entry(1, 1);
        entry.variant = Some("1TB".into());
        let err = price_cart(&[entry], &[phone]).unwrap_err();
        assert_eq!(err.code, ErrorCode::VariantNotFound);
    }

    #[test]
    fn test_catalog_price_is_authoritative() {
        // Cart snapshot claims $1.00; the catalog says $10.00 and wins.
        let items = price_cart(&[cart_entry(1, 2)], &[product(1, "10.00")]).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].unit_amount, 1000);
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[0].unit_amount * items[0].quantity as i64, 2000);
    }

    #[test]
    fn test_variant_price_used_when_selected() {
        let mut phone = product(1, "499.99");
        phone.variants = vec![Variant {
            name: "256GB".into(),
            price: "599.99".parse().unwrap(),
            stock: 5,
            track_inventory: true,
        }];
        let mut entry = cart_entry(1, 1);
        entry.variant = Some("256GB".into());
        let items = price_cart(&[entry], &[phone]).unwrap();
        assert_eq!(items[0].unit_amount, 59999);
        assert_eq!(items[0].variant.as_deref(), Some("256GB"));
    }
}
