//! Order database operations
//!
//! Orders are created exactly once per processor payment: the UNIQUE
//! constraint on `stripe_payment_intent` turns a duplicate insert into a
//! deterministic no-op instead of a race. Status transitions are guarded
//! in the WHERE clause of the mutating statement, never checked-then-acted.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::order::{Order, OrderLineItem, OrderStatus, ShippingAddress};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::{ServiceError, ServiceResult};

const ORDER_COLUMNS: &str = "id, created_at, customer_name, customer_email, customer_phone, \
     shipping_address, product_id, product_name, product_price, quantity, items, total_price, \
     currency, stripe_session_id, stripe_payment_intent, status, tracking_carrier, \
     tracking_number, tracking_url, estimated_delivery, completion_notes, completed_at, \
     refunded_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    created_at: DateTime<Utc>,
    customer_name: String,
    customer_email: String,
    customer_phone: Option<String>,
    shipping_address: Json<ShippingAddress>,
    product_id: Option<i64>,
    product_name: String,
    product_price: Decimal,
    quantity: i32,
    items: Json<Vec<OrderLineItem>>,
    total_price: Decimal,
    currency: String,
    stripe_session_id: String,
    stripe_payment_intent: String,
    status: String,
    tracking_carrier: Option<String>,
    tracking_number: Option<String>,
    tracking_url: Option<String>,
    estimated_delivery: Option<NaiveDate>,
    completion_notes: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    refunded_at: Option<DateTime<Utc>>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Order {
            id: row.id,
            created_at: row.created_at,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            customer_phone: row.customer_phone,
            shipping_address: row.shipping_address.0,
            product_id: row.product_id,
            product_name: row.product_name,
            product_price: row.product_price,
            quantity: row.quantity,
            items: row.items.0,
            total_price: row.total_price,
            currency: row.currency,
            stripe_session_id: row.stripe_session_id,
            stripe_payment_intent: row.stripe_payment_intent,
            status: OrderStatus::from_db(&row.status),
            tracking_carrier: row.tracking_carrier,
            tracking_number: row.tracking_number,
            tracking_url: row.tracking_url,
            estimated_delivery: row.estimated_delivery,
            completion_notes: row.completion_notes,
            completed_at: row.completed_at,
            refunded_at: row.refunded_at,
        }
    }
}

/// New order snapshot assembled by the reconciler from a completion event
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub shipping_address: ShippingAddress,
    pub items: Vec<OrderLineItem>,
    pub total_price: Decimal,
    pub currency: String,
    pub stripe_session_id: String,
    pub stripe_payment_intent: String,
}

/// Insert a new pending-shipment order.
///
/// Returns `None` when an order for this payment reference already exists
/// (duplicate event delivery); the caller treats that as already-processed.
pub async fn insert_completed(
    tx: &mut Transaction<'_, Postgres>,
    order: &NewOrder,
) -> ServiceResult<Option<i64>> {
    // first line item doubles as the legacy single-item display snapshot
    let first = order
        .items
        .first()
        .ok_or_else(|| AppError::new(ErrorCode::CartEmpty))?;

    let row: Option<(i64,)> = sqlx::query_as(
        "INSERT INTO orders
             (customer_name, customer_email, customer_phone, shipping_address,
              product_id, product_name, product_price, quantity, items,
              total_price, currency, stripe_session_id, stripe_payment_intent, status)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 'pending_shipment')
         ON CONFLICT (stripe_payment_intent) DO NOTHING
         RETURNING id",
    )
    .bind(&order.customer_name)
    .bind(&order.customer_email)
    .bind(&order.customer_phone)
    .bind(Json(&order.shipping_address))
    .bind(first.product_id)
    .bind(&first.name)
    .bind(first.unit_price)
    .bind(first.quantity)
    .bind(Json(&order.items))
    .bind(order.total_price)
    .bind(&order.currency)
    .bind(&order.stripe_session_id)
    .bind(&order.stripe_payment_intent)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row.map(|(id,)| id))
}

pub async fn get_order(pool: &PgPool, id: i64) -> ServiceResult<Order> {
    let row: Option<OrderRow> =
        sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?;
    row.map(Order::from)
        .ok_or_else(|| ServiceError::App(AppError::new(ErrorCode::OrderNotFound)))
}

/// Admin listing: optionally filtered by status, newest first.
pub async fn list_orders(pool: &PgPool, status: Option<OrderStatus>) -> ServiceResult<Vec<Order>> {
    let rows: Vec<OrderRow> = match status {
        Some(status) => {
            sqlx::query_as(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders WHERE status = $1 ORDER BY created_at DESC"
            ))
            .bind(status.as_db())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
            ))
            .fetch_all(pool)
            .await?
        }
    };
    Ok(rows.into_iter().map(Order::from).collect())
}

/// Shipping details provided by the admin on markShipped
#[derive(Debug, Clone, Deserialize)]
pub struct ShipDetails {
    pub carrier: String,
    pub tracking_number: String,
    pub tracking_url: Option<String>,
    pub estimated_delivery: Option<NaiveDate>,
}

/// pending_shipment → completed, with tracking fields.
///
/// The transition guard lives in the WHERE clause: a refunded or already
/// completed order is left untouched and reported as an invalid transition.
pub async fn mark_shipped(pool: &PgPool, id: i64, details: &ShipDetails) -> ServiceResult<Order> {
    let row: Option<OrderRow> = sqlx::query_as(&format!(
        "UPDATE orders
         SET status = 'completed', tracking_carrier = $2, tracking_number = $3,
             tracking_url = $4, estimated_delivery = $5, completed_at = now()
         WHERE id = $1 AND status = 'pending_shipment'
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(id)
    .bind(&details.carrier)
    .bind(&details.tracking_number)
    .bind(&details.tracking_url)
    .bind(details.estimated_delivery)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Order::from(row)),
        None => Err(transition_error(pool, id).await),
    }
}

/// pending_shipment → completed, without tracking info.
pub async fn mark_completed(
    pool: &PgPool,
    id: i64,
    notes: Option<&str>,
) -> ServiceResult<Order> {
    let row: Option<OrderRow> = sqlx::query_as(&format!(
        "UPDATE orders
         SET status = 'completed', completion_notes = $2, completed_at = now()
         WHERE id = $1 AND status = 'pending_shipment'
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(id)
    .bind(notes)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Order::from(row)),
        None => Err(transition_error(pool, id).await),
    }
}

/// Distinguish "no such order" from "transition not allowed" after a
/// guarded UPDATE matched nothing.
async fn transition_error(pool: &PgPool, id: i64) -> ServiceError {
    match sqlx::query_as::<_, (String,)>("SELECT status FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
    {
        Ok(Some((status,))) => ServiceError::App(
            AppError::new(ErrorCode::InvalidStatusTransition).with_detail("status", status),
        ),
        Ok(None) => ServiceError::App(AppError::new(ErrorCode::OrderNotFound)),
        Err(e) => ServiceError::Db(e.into()),
    }
}

/// Outcome of applying a refund event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefundOutcome {
    /// Order transitioned to refunded
    Applied { order_id: i64 },
    /// Order was already refunded; replay is a no-op
    AlreadyRefunded,
    /// No order exists for this payment reference yet (refund delivered
    /// before the completion event); caller must request redelivery
    NoMatchingOrder,
}

/// Idempotent refund transition.
///
/// Stock is deliberately not restored: refunds often correlate with
/// damaged or returned goods, so restocking is a manual admin decision.
pub async fn mark_refunded(
    pool: &PgPool,
    payment_intent: &str,
    refunded_at: DateTime<Utc>,
) -> ServiceResult<RefundOutcome> {
    let row: Option<(i64,)> = sqlx::query_as(
        "UPDATE orders SET status = 'refunded', refunded_at = $2
         WHERE stripe_payment_intent = $1 AND status <> 'refunded'
         RETURNING id",
    )
    .bind(payment_intent)
    .bind(refunded_at)
    .fetch_optional(pool)
    .await?;

    if let Some((order_id,)) = row {
        return Ok(RefundOutcome::Applied { order_id });
    }

    let exists: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM orders WHERE stripe_payment_intent = $1")
            .bind(payment_intent)
            .fetch_optional(pool)
            .await?;

    Ok(match exists {
        Some(_) => RefundOutcome::AlreadyRefunded,
        None => RefundOutcome::NoMatchingOrder,
    })
}

/// Orders the compensating refund sweep still needs to poll.
///
/// Bounded to orders created after `created_after` so the sweep's cost
/// tracks recent order volume, not all-time order history.
pub async fn list_unrefunded(
    pool: &PgPool,
    created_after: DateTime<Utc>,
) -> ServiceResult<Vec<(i64, String)>> {
    let rows: Vec<(i64, String)> = sqlx::query_as(
        "SELECT id, stripe_payment_intent FROM orders
         WHERE status <> 'refunded' AND created_at > $1",
    )
    .bind(created_after)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Dashboard aggregates
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct OrderStats {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub refunded_orders: i64,
    /// Revenue over non-refunded orders
    pub total_revenue: Decimal,
}

pub async fn stats(pool: &PgPool) -> ServiceResult<OrderStats> {
    let stats: OrderStats = sqlx::query_as(
        "SELECT COUNT(*) AS total_orders,
                COUNT(*) FILTER (WHERE status = 'pending_shipment') AS pending_orders,
                COUNT(*) FILTER (WHERE status = 'refunded') AS refunded_orders,
                COALESCE(SUM(total_price) FILTER (WHERE status <> 'refunded'), 0) AS total_revenue
         FROM orders",
    )
    .fetch_one(pool)
    .await?;
    Ok(stats)
}
