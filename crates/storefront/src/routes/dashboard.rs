//! Signed-in user's dashboard: stats, own orders and favorites.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use hearth_core::{OrderId, ProductId};

use crate::db::stats::UserStats;
use crate::db::{FavoriteRepository, OrderRepository, ProductRepository, StatsRepository};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::middleware::RequireAuth;
use crate::models::{OrderDetail, ProductSummary};
use crate::state::AppState;

/// Add-favorite request.
#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    pub product_id: ProductId,
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn stats(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<UserStats>> {
    let stats = StatsRepository::new(state.pool()).for_user(user.id).await?;
    Ok(Json(stats))
}

/// Own orders, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<OrderDetail>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(orders))
}

/// One own order. Other users' orders are reported as missing.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    OrderRepository::new(state.pool())
        .get_detail(id)
        .await?
        .filter(|detail| detail.order.user_id == Some(user.id))
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn favorites(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<ProductSummary>>> {
    let favorites = FavoriteRepository::new(state.pool()).list(user.id).await?;
    Ok(Json(favorites))
}

/// Save a product. Only active products can be favorited.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add_favorite(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<FavoriteRequest>,
) -> Result<StatusCode> {
    ProductRepository::new(state.pool())
        .get_by_id(req.product_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    FavoriteRepository::new(state.pool())
        .add(user.id, req.product_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<StatusCode> {
    FavoriteRepository::new(state.pool())
        .remove(user.id, product_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
