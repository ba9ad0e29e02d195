//! Order management and fulfilment status changes.

use axum::extract::State;
use serde::Deserialize;
use tracing::instrument;

use hearth_core::{OrderId, OrderStatus};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::RequireAdmin;
use crate::models::{Order, OrderDetail};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

/// All orders, newest first, optionally filtered by status.
#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool()).list(query.status).await?;
    Ok(Json(orders))
}

#[instrument(skip(state, _admin))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    let order = OrderRepository::new(state.pool())
        .get_detail(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    Ok(Json(order))
}

/// Move an order along its lifecycle.
///
/// Settling a pending order goes through the same path as a confirmed
/// payment so stock is decremented exactly once.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<OrderDetail>> {
    let repo = OrderRepository::new(state.pool());
    let order = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    let from = order.status;
    let to = req.status;
    if !from.can_transition_to(to) {
        return Err(AppError::BadRequest(format!(
            "cannot change order status from {from} to {to}"
        )));
    }

    let applied = if to == OrderStatus::Paid {
        repo.mark_paid(id).await?
    } else {
        repo.update_status(id, from, to).await?.is_some()
    };

    if !applied {
        return Err(AppError::Conflict(
            "Order status changed concurrently, reload and retry".to_string(),
        ));
    }

    tracing::info!(order_id = %id, %from, %to, "Order status changed");

    let detail = repo
        .get_detail(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    Ok(Json(detail))
}
