//! Public storefront catalog endpoints

use axum::Json;
use axum::extract::{Path, State};

use shared::error::{AppError, ErrorCode};
use shared::models::{Category, Product, ProductStatus, Tag};

use crate::db;
use crate::state::AppState;

use super::ApiResult;

/// GET /api/products
pub async fn list_products(State(state): State<AppState>) -> ApiResult<Vec<Product>> {
    let products = db::products::list_products(&state.pool, false).await?;
    Ok(Json(products))
}

/// GET /api/products/{id}
///
/// Drafts are hidden from the storefront even by direct id.
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Product> {
    let product = db::products::get_product(&state.pool, id).await?;
    if product.status != ProductStatus::Active {
        return Err(AppError::new(ErrorCode::ProductNotFound).into());
    }
    Ok(Json(product))
}

/// GET /api/featured
pub async fn list_featured(State(state): State<AppState>) -> ApiResult<Vec<Product>> {
    let products = db::featured::list_featured(&state.pool).await?;
    Ok(Json(products))
}

/// GET /api/categories
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    Ok(Json(db::categories::list_categories(&state.pool).await?))
}

/// GET /api/tags
pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Vec<Tag>> {
    Ok(Json(db::tags::list_tags(&state.pool).await?))
}
