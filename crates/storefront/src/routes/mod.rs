//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! # Catalog
//! GET    /api/categories                      - Category list with product counts
//! GET    /api/categories/{slug}               - Category detail
//! GET    /api/products                        - Filtered, sorted, paginated listing
//! GET    /api/products/{slug}                 - Product detail
//!
//! # Cart (session)
//! GET    /api/cart                            - Current cart
//! PUT    /api/cart                            - Replace the cart (bulk load)
//! DELETE /api/cart                            - Empty the cart
//! POST   /api/cart/items                      - Add one unit of a product
//! PUT    /api/cart/items/{product_id}         - Set a line's quantity
//! DELETE /api/cart/items/{product_id}         - Remove a line
//!
//! # Auth (stricter rate limit)
//! POST   /api/auth/register                   - Create an account, email a code
//! POST   /api/auth/otp/send                   - (Re)send an email verification code
//! POST   /api/auth/otp/verify                 - Verify the email and sign in
//! POST   /api/auth/login                      - Password login
//! POST   /api/auth/logout                     - End the session
//! GET    /api/auth/session                    - Signed-in user or null
//! POST   /api/auth/password                   - Change password (requires auth)
//! POST   /api/auth/password/forgot            - Email a reset code
//! POST   /api/auth/password/reset             - Reset with a code
//!
//! # Checkout (requires auth)
//! POST   /api/checkout/payment-intent         - Create order + PaymentIntent
//! GET    /api/checkout/payment-intent/{id}    - Sync and report payment status
//!
//! # Dashboard (requires auth)
//! GET    /api/dashboard/stats                 - Order and favorite summary
//! GET    /api/dashboard/orders                - Order history
//! GET    /api/dashboard/orders/{id}           - One order
//! GET    /api/dashboard/favorites             - Favorite products
//! POST   /api/dashboard/favorites             - Add a favorite
//! DELETE /api/dashboard/favorites/{id}        - Remove a favorite
//!
//! # Admin (requires admin role), see [`admin`]
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod checkout;
pub mod dashboard;
pub mod products;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(categories::index))
        .route("/categories/{slug}", get(categories::show))
        .route("/products", get(products::index))
        .route("/products/{slug}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).put(cart::load).delete(cart::clear))
        .route("/items", post(cart::add_item))
        .route(
            "/items/{product_id}",
            put(cart::set_quantity).delete(cart::remove_item),
        )
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/otp/send", post(auth::send_code))
        .route("/otp/verify", post(auth::verify_code))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/session", get(auth::current_session))
        .route("/password", post(auth::change_password))
        .route("/password/forgot", post(auth::forgot_password))
        .route("/password/reset", post(auth::reset_password))
        .layer(auth_rate_limiter())
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/payment-intent", post(checkout::create_payment_intent))
        .route(
            "/payment-intent/{id}",
            get(checkout::payment_intent_status),
        )
}

/// Create the customer dashboard routes router.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(dashboard::stats))
        .route("/orders", get(dashboard::orders))
        .route("/orders/{id}", get(dashboard::order))
        .route(
            "/favorites",
            get(dashboard::favorites).post(dashboard::add_favorite),
        )
        .route(
            "/favorites/{id}",
            axum::routing::delete(dashboard::remove_favorite),
        )
}

/// Create all API routes for the storefront.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .merge(catalog_routes())
        .nest("/cart", cart_routes())
        .nest("/auth", auth_routes())
        .nest("/checkout", checkout_routes())
        .nest("/dashboard", dashboard_routes())
        .nest("/admin", admin::admin_routes())
        .layer(api_rate_limiter());

    Router::new().nest("/api", api)
}
