//! Category and tag management

use axum::Json;
use axum::extract::{Path, State};

use shared::models::{Category, CategoryCreate, Tag, TagCreate};

use crate::api::ApiResult;
use crate::db;
use crate::state::AppState;

/// GET /api/admin/categories
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    Ok(Json(db::categories::list_categories(&state.pool).await?))
}

/// POST /api/admin/categories
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CategoryCreate>,
) -> ApiResult<Category> {
    let category = db::categories::create_category(&state.pool, &payload).await?;
    tracing::info!(category_id = category.id, name = %category.name, "Category created");
    Ok(Json(category))
}

/// PATCH /api/admin/categories/{id}
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<CategoryCreate>,
) -> ApiResult<Category> {
    Ok(Json(
        db::categories::update_category(&state.pool, id, &payload).await?,
    ))
}

/// DELETE /api/admin/categories/{id}
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    db::categories::delete_category(&state.pool, id).await?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}

/// GET /api/admin/tags
pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Vec<Tag>> {
    Ok(Json(db::tags::list_tags(&state.pool).await?))
}

/// POST /api/admin/tags
pub async fn create_tag(
    State(state): State<AppState>,
    Json(payload): Json<TagCreate>,
) -> ApiResult<Tag> {
    let tag = db::tags::create_tag(&state.pool, &payload).await?;
    tracing::info!(tag_id = tag.id, name = %tag.name, "Tag created");
    Ok(Json(tag))
}

/// DELETE /api/admin/tags/{id}
pub async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    db::tags::delete_tag(&state.pool, id).await?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}
