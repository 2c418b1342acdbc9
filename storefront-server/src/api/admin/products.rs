//! Admin product management

use axum::Json;
use axum::extract::{Path, State};

use shared::models::{Product, ProductCreate, ProductUpdate};

use crate::api::ApiResult;
use crate::db;
use crate::state::AppState;

/// GET /api/admin/products — includes drafts
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Product>> {
    let products = db::products::list_products(&state.pool, true).await?;
    Ok(Json(products))
}

/// GET /api/admin/products/{id}
pub async fn get(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Product> {
    Ok(Json(db::products::get_product(&state.pool, id).await?))
}

/// POST /api/admin/products
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<ProductCreate>,
) -> ApiResult<Product> {
    let product = db::products::create_product(&state.pool, &payload).await?;
    tracing::info!(product_id = product.id, name = %product.name, "Product created");
    Ok(Json(product))
}

/// PATCH /api/admin/products/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<ProductUpdate>,
) -> ApiResult<Product> {
    let product = db::products::update_product(&state.pool, id, &payload).await?;
    tracing::info!(product_id = id, "Product updated");
    Ok(Json(product))
}

/// DELETE /api/admin/products/{id} — soft delete
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    db::products::soft_delete_product(&state.pool, id).await?;
    tracing::info!(product_id = id, "Product deleted");
    Ok(Json(serde_json::json!({ "deleted": id })))
}
