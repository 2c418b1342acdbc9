//! Featured ranking operations
//!
//! At most [`FEATURED_CAPACITY`] active, non-deleted products are featured,
//! and their ranks form a dense 1..=k permutation. Every mutation of the
//! featured set runs under a transaction-scoped advisory lock so capacity
//! checks and re-ranking never interleave; a partial unique index on
//! `featured_rank` backstops the invariant at the datastore level.

use shared::error::{AppError, ErrorCode};
use shared::models::product::Product;
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::{ServiceError, ServiceResult};

use super::products::ProductRow;

/// Maximum number of concurrently featured products
pub const FEATURED_CAPACITY: i64 = 3;

/// Advisory lock key for the whole featured set. Capacity checking and
/// re-ranking read the entire set, so serialization is per-set, not
/// per-product.
const FEATURED_SET_LOCK: i64 = 0x5fea_74ed;

/// The canonical qualification predicate. Capacity and listing must always
/// be computed over this predicate, never over `is_featured` alone:
/// a product that went draft or was deleted while featured is excluded
/// even if its flags were not eagerly cleared.
const QUALIFYING: &str = "is_featured AND status = 'active' AND NOT deleted";

/// Take the transaction-scoped featured-set lock. Released on commit/rollback.
pub async fn lock_featured_set(tx: &mut Transaction<'_, Postgres>) -> ServiceResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(FEATURED_SET_LOCK)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Feature a product, assigning it the next dense rank.
///
/// The qualifying count is recomputed from live state inside the locked
/// transaction, immediately before the write. Fails with
/// `FeaturedCapacityExceeded` when the set is full.
pub async fn add_featured(pool: &PgPool, product_id: i64) -> ServiceResult<()> {
    let mut tx = pool.begin().await?;
    lock_featured_set(&mut tx).await?;

    let row: Option<(bool, String, bool)> =
        sqlx::query_as("SELECT is_featured, status, deleted FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?;

    let (is_featured, status, deleted) =
        row.ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
    if deleted {
        return Err(ServiceError::App(AppError::new(ErrorCode::ProductNotFound)));
    }
    if status != "active" {
        return Err(ServiceError::App(AppError::validation(
            "Only active products can be featured",
        )));
    }
    if is_featured {
        return Err(ServiceError::App(AppError::conflict(
            "Product is already featured",
        )));
    }

    let (count,): (i64,) =
        sqlx::query_as(&format!("SELECT COUNT(*) FROM products WHERE {QUALIFYING}"))
            .fetch_one(&mut *tx)
            .await?;
    if count >= FEATURED_CAPACITY {
        return Err(ServiceError::App(AppError::new(
            ErrorCode::FeaturedCapacityExceeded,
        )));
    }

    sqlx::query(
        "UPDATE products SET is_featured = TRUE, featured_rank = $2, updated_at = now()
         WHERE id = $1",
    )
    .bind(product_id)
    .bind((count + 1) as i32)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Unfeature a product and close the rank gap it leaves behind.
pub async fn remove_featured(pool: &PgPool, product_id: i64) -> ServiceResult<()> {
    let mut tx = pool.begin().await?;
    lock_featured_set(&mut tx).await?;

    let rows = sqlx::query(
        "UPDATE products SET is_featured = FALSE, featured_rank = NULL, updated_at = now()
         WHERE id = $1 AND is_featured",
    )
    .bind(product_id)
    .execute(&mut *tx)
    .await?;

    if rows.rows_affected() == 0 {
        return Err(ServiceError::App(AppError::new(ErrorCode::NotFeatured)));
    }

    resequence(&mut tx).await?;
    tx.commit().await?;
    Ok(())
}

/// Re-densify the ranks of qualifying featured products to 1..=k, keeping
/// their prior order. Caller must hold the featured-set lock.
///
/// Rows are updated in ascending rank order: each new rank is <= the old
/// one, so the partial unique index never sees a transient duplicate.
pub async fn resequence(tx: &mut Transaction<'_, Postgres>) -> ServiceResult<()> {
    let ids: Vec<(i64,)> = sqlx::query_as(&format!(
        "SELECT id FROM products WHERE {QUALIFYING} ORDER BY featured_rank"
    ))
    .fetch_all(&mut **tx)
    .await?;

    for (i, (id,)) in ids.iter().enumerate() {
        let rank = (i + 1) as i32;
        sqlx::query(
            "UPDATE products SET featured_rank = $2 WHERE id = $1 AND featured_rank <> $2",
        )
        .bind(id)
        .bind(rank)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Display listing: qualifying featured products by rank, capped at capacity.
pub async fn list_featured(pool: &PgPool) -> ServiceResult<Vec<Product>> {
    let rows: Vec<ProductRow> = sqlx::query_as(&format!(
        "SELECT id, name, description, price, stock, track_inventory, images,
                category_ids, tag_ids, status, deleted, is_featured, featured_rank, created_at
         FROM products WHERE {QUALIFYING}
         ORDER BY featured_rank ASC LIMIT {FEATURED_CAPACITY}"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into_product(Vec::new())).collect())
}

/// Pure dense re-rank: given (id, prior_rank) pairs, assign 1..=k keeping
/// prior order. Mirrors what [`resequence`] does in SQL.
pub fn dense_ranks(mut ranked: Vec<(i64, i32)>) -> Vec<(i64, i32)> {
    ranked.sort_by_key(|&(_, rank)| rank);
    ranked
        .into_iter()
        .enumerate()
        .map(|(i, (id, _))| (id, (i + 1) as i32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_ranks_closes_gap() {
        // {P1:1, P2:2, P3:3}, remove P2 -> {P1:1, P3:2}
        let out = dense_ranks(vec![(1, 1), (3, 3)]);
        assert_eq!(out, vec![(1, 1), (3, 2)]);
    }

    #[test]
    fn test_dense_ranks_preserves_order() {
        let out = dense_ranks(vec![(9, 3), (4, 1), (7, 2)]);
        assert_eq!(out, vec![(4, 1), (7, 2), (9, 3)]);
    }

    #[test]
    fn test_dense_ranks_empty() {
        assert!(dense_ranks(vec![]).is_empty());
    }

    #[test]
    fn test_dense_ranks_never_exceeds_input_rank() {
        // resequence relies on new ranks never exceeding old ones so the
        // unique index sees no transient duplicates
        let input = vec![(1, 2), (2, 5), (3, 9)];
        for (new, old) in dense_ranks(input.clone())
            .iter()
            .map(|&(_, r)| r)
            .zip(input.iter().map(|&(_, r)| r))
        {
            assert!(new <= old);
        }
    }
}
