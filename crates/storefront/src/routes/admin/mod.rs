//! Back office routes.
//!
//! Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin),
//! which re-reads the caller's role from the database.

pub mod categories;
pub mod orders;
pub mod products;
pub mod stats;
pub mod users;

use axum::{
    Router,
    routing::get,
};

use crate::state::AppState;

/// Create the admin API router (mounted at `/api/admin`).
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats::show))
        .route("/users", get(users::index))
        .route("/users/{id}", axum::routing::patch(users::update).delete(users::destroy))
        .route("/products", get(products::index).post(products::create))
        .route(
            "/products/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::destroy),
        )
        .route(
            "/categories",
            get(categories::index).post(categories::create),
        )
        .route(
            "/categories/{id}",
            axum::routing::put(categories::update).delete(categories::destroy),
        )
        .route("/orders", get(orders::index))
        .route(
            "/orders/{id}",
            get(orders::show).patch(orders::update_status),
        )
}
