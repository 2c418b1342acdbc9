//! Admin order management: list, ship, complete, dashboard stats

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use shared::error::AppError;
use shared::models::{Order, OrderStatus};

use crate::api::ApiResult;
use crate::db::orders::{self, OrderStats, ShipDetails};
use crate::email;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
}

/// GET /api/admin/orders?status=pending_shipment
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<Vec<Order>> {
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some("pending_shipment") => Some(OrderStatus::PendingShipment),
        Some("completed") => Some(OrderStatus::Completed),
        Some("refunded") => Some(OrderStatus::Refunded),
        Some(raw) => {
            return Err(AppError::invalid_request(format!("Unknown order status: {raw}")).into());
        }
    };
    Ok(Json(orders::list_orders(&state.pool, status).await?))
}

/// GET /api/admin/orders/{id}
pub async fn get(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Order> {
    Ok(Json(orders::get_order(&state.pool, id).await?))
}

/// POST /api/admin/orders/{id}/ship
///
/// pending_shipment → completed with tracking details. The customer gets a
/// shipping notification; a failed send never undoes the transition.
pub async fn ship(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(details): Json<ShipDetails>,
) -> ApiResult<Order> {
    let order = orders::mark_shipped(&state.pool, id, &details).await?;
    tracing::info!(order_id = id, carrier = %details.carrier, "Order shipped");

    {
        let state = state.clone();
        let order = order.clone();
        tokio::spawn(async move {
            email::send_shipping_notification(&state, &order).await;
        });
    }

    Ok(Json(order))
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteRequest {
    pub notes: Option<String>,
}

/// POST /api/admin/orders/{id}/complete
///
/// pending_shipment → completed without tracking (pickup, digital goods).
pub async fn complete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<CompleteRequest>,
) -> ApiResult<Order> {
    let order = orders::mark_completed(&state.pool, id, payload.notes.as_deref()).await?;
    tracing::info!(order_id = id, "Order completed");
    Ok(Json(order))
}

/// GET /api/admin/stats — dashboard counters
pub async fn stats(State(state): State<AppState>) -> ApiResult<OrderStats> {
    Ok(Json(orders::stats(&state.pool).await?))
}
