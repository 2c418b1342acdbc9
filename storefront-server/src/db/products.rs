//! Product database operations

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::product::{Product, ProductCreate, ProductStatus, ProductUpdate, Variant};
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::{ServiceError, ServiceResult};

use super::featured;

const PRODUCT_COLUMNS: &str = "id, name, description, price, stock, track_inventory, images, \
     category_ids, tag_ids, status, deleted, is_featured, featured_rank, created_at";

/// Raw product row; variants are loaded separately
#[derive(Debug, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub track_inventory: bool,
    pub images: Vec<String>,
    pub category_ids: Vec<i64>,
    pub tag_ids: Vec<i64>,
    pub status: String,
    pub deleted: bool,
    pub is_featured: bool,
    pub featured_rank: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl ProductRow {
    pub fn into_product(self, variants: Vec<Variant>) -> Product {
        Product {
            id: self.id,
            name: self.name,
            description: self.description,
            price: self.price,
            stock: self.stock,
            track_inventory: self.track_inventory,
            variants,
            images: self.images,
            category_ids: self.category_ids,
            tag_ids: self.tag_ids,
            status: ProductStatus::from_db(&self.status),
            deleted: self.deleted,
            is_featured: self.is_featured,
            featured_rank: self.featured_rank,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VariantRow {
    product_id: i64,
    name: String,
    price: Decimal,
    stock: i32,
    track_inventory: bool,
}

/// Validate the fields common to create and update payloads.
///
/// Price must be positive and the name non-empty. Stock is ignored
/// (treated as unlimited) when inventory is not tracked, so it is never
/// validated here.
pub fn validate_fields(name: Option<&str>, price: Option<&Decimal>) -> Result<(), AppError> {
    if let Some(name) = name {
        if name.trim().is_empty() {
            return Err(AppError::validation("Product name must not be empty").with_detail("field", "name"));
        }
    }
    if let Some(price) = price {
        if *price <= Decimal::ZERO {
            return Err(AppError::new(ErrorCode::ProductInvalidPrice).with_detail("field", "price"));
        }
    }
    Ok(())
}

fn validate_variants(variants: &[Variant]) -> Result<(), AppError> {
    for v in variants {
        if v.name.trim().is_empty() {
            return Err(AppError::validation("Variant name must not be empty"));
        }
        if v.price <= Decimal::ZERO {
            return Err(AppError::new(ErrorCode::ProductInvalidPrice)
                .with_detail("variant", v.name.clone()));
        }
    }
    Ok(())
}

async fn load_variants(
    pool: &PgPool,
    product_ids: &[i64],
) -> ServiceResult<HashMap<i64, Vec<Variant>>> {
    if product_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<VariantRow> = sqlx::query_as(
        "SELECT product_id, name, price, stock, track_inventory
         FROM product_variants WHERE product_id = ANY($1) ORDER BY product_id, position",
    )
    .bind(product_ids)
    .fetch_all(pool)
    .await?;

    let mut map: HashMap<i64, Vec<Variant>> = HashMap::new();
    for row in rows {
        map.entry(row.product_id).or_default().push(Variant {
            name: row.name,
            price: row.price,
            stock: row.stock,
            track_inventory: row.track_inventory,
        });
    }
    Ok(map)
}

async fn assemble(pool: &PgPool, rows: Vec<ProductRow>) -> ServiceResult<Vec<Product>> {
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut variants = load_variants(pool, &ids).await?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let v = variants.remove(&row.id).unwrap_or_default();
            row.into_product(v)
        })
        .collect())
}

/// Storefront listing: active, non-deleted products, newest first.
/// Admin listing (`include_drafts`) also shows drafts.
pub async fn list_products(pool: &PgPool, include_drafts: bool) -> ServiceResult<Vec<Product>> {
    let sql = if include_drafts {
        format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE NOT deleted ORDER BY created_at DESC")
    } else {
        format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE NOT deleted AND status = 'active' ORDER BY created_at DESC"
        )
    };
    let rows: Vec<ProductRow> = sqlx::query_as(&sql).fetch_all(pool).await?;
    assemble(pool, rows).await
}

pub async fn get_product(pool: &PgPool, id: i64) -> ServiceResult<Product> {
    let row: Option<ProductRow> = sqlx::query_as(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND NOT deleted"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let row = row.ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
    let mut variants = load_variants(pool, &[id]).await?;
    Ok(row.into_product(variants.remove(&id).unwrap_or_default()))
}

/// Best-effort lookup used only for legacy checkout sessions whose line
/// items carry no stable product id. Matching by display name breaks as
/// soon as a product is renamed; the metadata path avoids this entirely.
pub async fn find_id_by_name(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
) -> ServiceResult<Option<i64>> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM products WHERE name = $1 AND NOT deleted LIMIT 1")
            .bind(name)
            .fetch_optional(&mut **tx)
            .await?;
    Ok(row.map(|(id,)| id))
}

pub async fn create_product(pool: &PgPool, data: &ProductCreate) -> ServiceResult<Product> {
    validate_fields(Some(&data.name), Some(&data.price))?;
    if let Some(variants) = &data.variants {
        validate_variants(variants)?;
    }

    let mut tx = pool.begin().await?;

    let row: ProductRow = sqlx::query_as(&format!(
        "INSERT INTO products
             (name, description, price, stock, track_inventory, images,
              category_ids, tag_ids, status)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(data.name.trim())
    .bind(data.description.as_deref().unwrap_or(""))
    .bind(data.price)
    .bind(data.stock.unwrap_or(0).max(0))
    .bind(data.track_inventory.unwrap_or(true))
    .bind(data.images.clone().unwrap_or_default())
    .bind(data.category_ids.clone().unwrap_or_default())
    .bind(data.tag_ids.clone().unwrap_or_default())
    .bind(data.status.unwrap_or_default().as_db())
    .fetch_one(&mut *tx)
    .await?;

    let variants = data.variants.clone().unwrap_or_default();
    replace_variants(&mut tx, row.id, &variants).await?;

    tx.commit().await?;
    Ok(row.into_product(variants))
}

pub async fn update_product(
    pool: &PgPool,
    id: i64,
    data: &ProductUpdate,
) -> ServiceResult<Product> {
    validate_fields(data.name.as_deref(), data.price.as_ref())?;
    if let Some(variants) = &data.variants {
        validate_variants(variants)?;
    }

    let mut tx = pool.begin().await?;

    // A status change can shrink the qualifying featured set, which means
    // the remaining ranks must be re-densified under the featured-set lock.
    let touches_featured_set = data.status.is_some();
    if touches_featured_set {
        featured::lock_featured_set(&mut tx).await?;
    }

    let row: Option<ProductRow> = sqlx::query_as(&format!(
        "UPDATE products SET
             name = COALESCE($1, name),
             description = COALESCE($2, description),
             price = COALESCE($3, price),
             stock = COALESCE($4, stock),
             track_inventory = COALESCE($5, track_inventory),
             images = COALESCE($6, images),
             category_ids = COALESCE($7, category_ids),
             tag_ids = COALESCE($8, tag_ids),
             status = COALESCE($9, status),
             updated_at = now()
         WHERE id = $10 AND NOT deleted
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(data.name.as_ref().map(|n| n.trim().to_string()))
    .bind(data.description.as_deref())
    .bind(data.price)
    .bind(data.stock.map(|s| s.max(0)))
    .bind(data.track_inventory)
    .bind(data.images.clone())
    .bind(data.category_ids.clone())
    .bind(data.tag_ids.clone())
    .bind(data.status.map(|s| s.as_db()))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let mut row = row.ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;

    // A product moved to draft no longer qualifies for a featured slot;
    // clear its flag eagerly, then close the rank gap it leaves behind.
    if row.status == "draft" && row.is_featured {
        sqlx::query(
            "UPDATE products SET is_featured = FALSE, featured_rank = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        row.is_featured = false;
        row.featured_rank = None;
    }
    if touches_featured_set {
        featured::resequence(&mut tx).await?;
    }

    let variants = match &data.variants {
        Some(variants) => {
            replace_variants(&mut tx, id, variants).await?;
            variants.clone()
        }
        None => {
            let rows: Vec<VariantRow> = sqlx::query_as(
                "SELECT product_id, name, price, stock, track_inventory
                 FROM product_variants WHERE product_id = $1 ORDER BY position",
            )
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;
            rows.into_iter()
                .map(|r| Variant {
                    name: r.name,
                    price: r.price,
                    stock: r.stock,
                    track_inventory: r.track_inventory,
                })
                .collect()
        }
    };

    tx.commit().await?;
    Ok(row.into_product(variants))
}

/// Soft delete: the row stays for order history, but the product leaves
/// every listing and gives up its featured slot.
pub async fn soft_delete_product(pool: &PgPool, id: i64) -> ServiceResult<()> {
    let mut tx = pool.begin().await?;
    featured::lock_featured_set(&mut tx).await?;

    let rows = sqlx::query(
        "UPDATE products
         SET deleted = TRUE, is_featured = FALSE, featured_rank = NULL, updated_at = now()
         WHERE id = $1 AND NOT deleted",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if rows.rows_affected() == 0 {
        return Err(ServiceError::App(AppError::new(ErrorCode::ProductNotFound)));
    }

    featured::resequence(&mut tx).await?;
    tx.commit().await?;
    Ok(())
}

async fn replace_variants(
    tx: &mut Transaction<'_, Postgres>,
    product_id: i64,
    variants: &[Variant],
) -> ServiceResult<()> {
    sqlx::query("DELETE FROM product_variants WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut **tx)
        .await?;

    for (position, v) in variants.iter().enumerate() {
        sqlx::query(
            "INSERT INTO product_variants (product_id, name, price, stock, track_inventory, position)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(product_id)
        .bind(&v.name)
        .bind(v.price)
        .bind(v.stock.max(0))
        .bind(v.track_inventory)
        .bind(position as i32)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Atomic conditional decrement, floored at zero.
///
/// Never a read-modify-write pair: concurrent completions for the same
/// product race on a single UPDATE, not on stale reads.
pub async fn decrement_stock(
    tx: &mut Transaction<'_, Postgres>,
    product_id: i64,
    quantity: i32,
) -> ServiceResult<()> {
    sqlx::query(
        "UPDATE products
         SET stock = GREATEST(stock - $2, 0), updated_at = now()
         WHERE id = $1 AND track_inventory",
    )
    .bind(product_id)
    .bind(quantity)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Atomic conditional decrement for a variant, floored at zero.
pub async fn decrement_variant_stock(
    tx: &mut Transaction<'_, Postgres>,
    product_id: i64,
    variant: &str,
    quantity: i32,
) -> ServiceResult<()> {
    sqlx::query(
        "UPDATE product_variants
         SET stock = GREATEST(stock - $3, 0)
         WHERE product_id = $1 AND name = $2 AND track_inventory",
    )
    .bind(product_id)
    .bind(variant)
    .bind(quantity)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        assert!(validate_fields(Some("  "), None).is_err());
        assert!(validate_fields(Some(""), Some(&dec("1.00"))).is_err());
        assert!(validate_fields(Some("Phone"), None).is_ok());
    }

    #[test]
    fn test_validate_rejects_nonpositive_price() {
        let err = validate_fields(None, Some(&dec("0"))).unwrap_err();
        assert_eq!(err.code, ErrorCode::ProductInvalidPrice);
        assert!(validate_fields(None, Some(&dec("-5.00"))).is_err());
        assert!(validate_fields(None, Some(&dec("0.01"))).is_ok());
    }

    #[test]
    fn test_validate_variants() {
        let good = vec![Variant {
            name: "128GB".into(),
            price: dec("499.99"),
            stock: 3,
            track_inventory: true,
        }];
        assert!(validate_variants(&good).is_ok());

        let bad = vec![Variant {
            name: "256GB".into(),
            price: dec("0"),
            stock: 3,
            track_inventory: true,
        }];
        assert!(validate_variants(&bad).is_err());
    }
}
