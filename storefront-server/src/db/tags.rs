//! Tag database operations

use shared::error::{AppError, ErrorCode};
use shared::models::tag::{Tag, TagCreate};
use sqlx::PgPool;

use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, sqlx::FromRow)]
struct TagRow {
    id: i64,
    name: String,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Tag {
            id: row.id,
            name: row.name,
        }
    }
}

pub async fn list_tags(pool: &PgPool) -> ServiceResult<Vec<Tag>> {
    let rows: Vec<TagRow> = sqlx::query_as("SELECT id, name FROM tags ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(Tag::from).collect())
}

pub async fn create_tag(pool: &PgPool, data: &TagCreate) -> ServiceResult<Tag> {
    if data.name.trim().is_empty() {
        return Err(ServiceError::App(AppError::validation(
            "Tag name must not be empty",
        )));
    }

    let row: Option<TagRow> = sqlx::query_as(
        "INSERT INTO tags (name) VALUES ($1)
         ON CONFLICT (name) DO NOTHING
         RETURNING id, name",
    )
    .bind(data.name.trim())
    .fetch_optional(pool)
    .await?;

    row.map(Tag::from)
        .ok_or_else(|| ServiceError::App(AppError::new(ErrorCode::TagNameExists)))
}

pub async fn delete_tag(pool: &PgPool, id: i64) -> ServiceResult<()> {
    let rows = sqlx::query("DELETE FROM tags WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(ServiceError::App(AppError::new(ErrorCode::TagNotFound)));
    }
    Ok(())
}
