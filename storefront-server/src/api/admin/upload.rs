//! Product image upload
//!
//! The server never stores image bytes; it forwards them to the external
//! blob store and hands back the public URL for the catalog to reference.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::error::AppError;

use crate::api::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// POST /api/admin/upload?filename=photo.jpg — raw image body
pub async fn upload_image(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> ApiResult<UploadResponse> {
    if body.is_empty() {
        return Err(AppError::invalid_request("Empty upload body").into());
    }

    // Object key is randomized; the original filename only contributes the
    // extension so a reused name never overwrites an existing image.
    let extension = query
        .filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin");
    let key = format!("products/{}.{extension}", Uuid::new_v4());

    let resp = state
        .http
        .put(format!("{}/{key}", state.blob_store_url.trim_end_matches('/')))
        .body(body)
        .send()
        .await
        .map_err(|e| {
            tracing::error!("Blob store unreachable: {e}");
            AppError::external("Image upload failed")
        })?;

    if !resp.status().is_success() {
        tracing::error!(status = %resp.status(), key, "Blob store rejected upload");
        return Err(AppError::external("Image upload failed").into());
    }

    let url = format!(
        "{}/{key}",
        state.blob_public_base_url.trim_end_matches('/')
    );
    tracing::info!(key, "Image uploaded");
    Ok(Json(UploadResponse { url }))
}
