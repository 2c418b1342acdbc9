//! Featured set management
//!
//! The capacity and rank invariants are enforced in the db layer under the
//! featured-set advisory lock; these handlers only shape the HTTP surface.

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;

use shared::models::Product;

use crate::api::ApiResult;
use crate::db;
use crate::state::AppState;

/// GET /api/admin/featured — current set, rank order
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Product>> {
    Ok(Json(db::featured::list_featured(&state.pool).await?))
}

#[derive(Debug, Deserialize)]
pub struct FeatureRequest {
    pub product_id: i64,
}

/// POST /api/admin/featured — append at the next rank
pub async fn add(
    State(state): State<AppState>,
    Json(payload): Json<FeatureRequest>,
) -> ApiResult<Vec<Product>> {
    db::featured::add_featured(&state.pool, payload.product_id).await?;
    tracing::info!(product_id = payload.product_id, "Product featured");
    Ok(Json(db::featured::list_featured(&state.pool).await?))
}

/// DELETE /api/admin/featured/{id} — remove and close the rank gap
pub async fn remove(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
) -> ApiResult<Vec<Product>> {
    db::featured::remove_featured(&state.pool, product_id).await?;
    tracing::info!(product_id, "Product unfeatured");
    Ok(Json(db::featured::list_featured(&state.pool).await?))
}
