//! Category database operations

use shared::error::{AppError, ErrorCode};
use shared::models::category::{Category, CategoryCreate};
use sqlx::PgPool;

use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
        }
    }
}

pub async fn list_categories(pool: &PgPool) -> ServiceResult<Vec<Category>> {
    let rows: Vec<CategoryRow> =
        sqlx::query_as("SELECT id, name FROM categories ORDER BY name")
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(Category::from).collect())
}

pub async fn create_category(pool: &PgPool, data: &CategoryCreate) -> ServiceResult<Category> {
    if data.name.trim().is_empty() {
        return Err(ServiceError::App(AppError::validation(
            "Category name must not be empty",
        )));
    }

    let row: Option<CategoryRow> = sqlx::query_as(
        "INSERT INTO categories (name) VALUES ($1)
         ON CONFLICT (name) DO NOTHING
         RETURNING id, name",
    )
    .bind(data.name.trim())
    .fetch_optional(pool)
    .await?;

    row.map(Category::from)
        .ok_or_else(|| ServiceError::App(AppError::new(ErrorCode::CategoryNameExists)))
}

pub async fn update_category(pool: &PgPool, id: i64, data: &CategoryCreate) -> ServiceResult<Category> {
    if data.name.trim().is_empty() {
        return Err(ServiceError::App(AppError::validation(
            "Category name must not be empty",
        )));
    }

    let row: Option<CategoryRow> =
        sqlx::query_as("UPDATE categories SET name = $2 WHERE id = $1 RETURNING id, name")
            .bind(id)
            .bind(data.name.trim())
            .fetch_optional(pool)
            .await?;

    row.map(Category::from)
        .ok_or_else(|| ServiceError::App(AppError::new(ErrorCode::CategoryNotFound)))
}

pub async fn delete_category(pool: &PgPool, id: i64) -> ServiceResult<()> {
    let rows = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(ServiceError::App(AppError::new(ErrorCode::CategoryNotFound)));
    }
    Ok(())
}
