//! Cart route handlers.
//!
//! The cart lives in the session as an [`OwnedCart`] and every mutation goes
//! through the `hearth-core` reducer. Prices and stock ceilings are taken
//! from the catalog, never from the request body.

use std::collections::HashMap;

use axum::extract::State;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use hearth_core::cart::OwnerChange;
use hearth_core::{Cart, CartAction, LineItem, OwnedCart, ProductId, UserId};

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::middleware::OptionalAuth;
use crate::models::{ProductSummary, session_keys};
use crate::state::AppState;

// =============================================================================
// Session Helpers
// =============================================================================

/// Read the session cart and align it with the signed-in identity.
///
/// A missing or unreadable cart starts empty. Owner changes are persisted
/// immediately so a cleared cart stays cleared.
///
/// # Errors
///
/// Returns `AppError::Session` if the session store fails.
pub async fn load_cart(session: &Session, user: Option<UserId>) -> Result<OwnedCart> {
    let mut owned = match session.get::<OwnedCart>(session_keys::CART).await {
        Ok(cart) => cart.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Discarding unreadable session cart");
            OwnedCart::default()
        }
    };

    match owned.reconcile_owner(user) {
        OwnerChange::Unchanged => {}
        change => {
            tracing::debug!(?change, "Cart owner reconciled");
            save_cart(session, &owned).await?;
        }
    }

    Ok(owned)
}

/// Persist the cart to the session.
///
/// # Errors
///
/// Returns `AppError::Session` if the session store fails.
pub async fn save_cart(session: &Session, cart: &OwnedCart) -> Result<()> {
    session.insert(session_keys::CART, cart).await?;
    Ok(())
}

/// Load, apply one action, save, and return the new cart.
async fn mutate(session: &Session, user: Option<UserId>, action: CartAction) -> Result<Cart> {
    let mut owned = load_cart(session, user).await?;
    owned.cart.apply(action);
    save_cart(session, &owned).await?;
    Ok(owned.cart)
}

// =============================================================================
// Request Types
// =============================================================================

/// Add-to-cart request.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
}

/// Set-quantity request. Zero or negative removes the line.
#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i64,
}

/// One line of a bulk load.
#[derive(Debug, Deserialize)]
pub struct LoadLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Bulk-load request: replace the cart with these lines.
#[derive(Debug, Deserialize)]
pub struct LoadCartRequest {
    pub items: Vec<LoadLine>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Current cart.
#[instrument(skip(session, user))]
pub async fn show(session: Session, OptionalAuth(user): OptionalAuth) -> Result<Json<Cart>> {
    let owned = load_cart(&session, user.map(|u| u.id)).await?;
    Ok(Json(owned.cart))
}

/// Add one unit of a product.
#[instrument(skip(state, session, user))]
pub async fn add_item(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<Cart>> {
    let products = ProductRepository::new(state.pool());

    let product = products
        .get_by_id(req.product_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    if product.stock <= 0 {
        return Err(AppError::Conflict(format!("{} is out of stock", product.name)));
    }

    let image = products
        .images(product.id)
        .await?
        .into_iter()
        .next()
        .map(|img| img.url);

    let cart = mutate(
        &session,
        user.map(|u| u.id),
        CartAction::Add(product.snapshot(image)),
    )
    .await?;

    Ok(Json(cart))
}

/// Set a line's quantity.
#[instrument(skip(session, user))]
pub async fn set_quantity(
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(product_id): Path<ProductId>,
    Json(req): Json<SetQuantityRequest>,
) -> Result<Json<Cart>> {
    let cart = mutate(
        &session,
        user.map(|u| u.id),
        CartAction::SetQuantity {
            product_id,
            quantity: req.quantity,
        },
    )
    .await?;

    Ok(Json(cart))
}

/// Remove a line.
#[instrument(skip(session, user))]
pub async fn remove_item(
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Cart>> {
    let cart = mutate(&session, user.map(|u| u.id), CartAction::Remove(product_id)).await?;
    Ok(Json(cart))
}

/// Empty the cart.
#[instrument(skip(session, user))]
pub async fn clear(session: Session, OptionalAuth(user): OptionalAuth) -> Result<Json<Cart>> {
    let cart = mutate(&session, user.map(|u| u.id), CartAction::Clear).await?;
    Ok(Json(cart))
}

/// Replace the cart, e.g. when a client restores a locally saved cart.
///
/// Names, prices, images and stock are refreshed from the catalog; unknown
/// and inactive products are dropped.
#[instrument(skip(state, session, user, req), fields(lines = req.items.len()))]
pub async fn load(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Json(req): Json<LoadCartRequest>,
) -> Result<Json<Cart>> {
    let ids: Vec<ProductId> = req.items.iter().map(|l| l.product_id).collect();
    let catalog: HashMap<ProductId, ProductSummary> = ProductRepository::new(state.pool())
        .get_many(&ids)
        .await?
        .into_iter()
        .map(|p| (p.product.id, p))
        .collect();

    let lines = refresh_lines(&req.items, &catalog);
    let cart = mutate(&session, user.map(|u| u.id), CartAction::Load(lines)).await?;
    Ok(Json(cart))
}

/// Rebuild client-supplied lines from catalog data, keeping only the
/// requested quantity. Unknown and inactive products are dropped.
fn refresh_lines(
    lines: &[LoadLine],
    catalog: &HashMap<ProductId, ProductSummary>,
) -> Vec<LineItem> {
    lines
        .iter()
        .filter_map(|line| {
            let summary = catalog
                .get(&line.product_id)
                .filter(|s| s.product.is_active)?;
            let snapshot = summary.product.snapshot(summary.image.clone());
            Some(LineItem {
                product_id: snapshot.product_id,
                name: snapshot.name,
                unit_price: snapshot.unit_price,
                quantity: line.quantity,
                image: snapshot.image,
                slug: snapshot.slug,
                stock: snapshot.stock,
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use hearth_core::Slug;
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::Product;

    fn summary(id: i32, price_cents: i64, stock: i32, is_active: bool) -> ProductSummary {
        ProductSummary {
            product: Product {
                id: ProductId::new(id),
                category_id: None,
                name: format!("Product {id}"),
                slug: Slug::parse(&format!("product-{id}")).unwrap(),
                description: String::new(),
                price: Decimal::new(price_cents, 2),
                stock,
                is_active,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            image: Some(format!("https://cdn.hearth.test/{id}.jpg")),
            category_slug: None,
        }
    }

    fn catalog(products: Vec<ProductSummary>) -> HashMap<ProductId, ProductSummary> {
        products.into_iter().map(|p| (p.product.id, p)).collect()
    }

    fn line(id: i32, quantity: u32) -> LoadLine {
        LoadLine {
            product_id: ProductId::new(id),
            quantity,
        }
    }

    #[test]
    fn test_refresh_takes_catalog_data() {
        let catalog = catalog(vec![summary(1, 4500, 7, true)]);

        let lines = refresh_lines(&[line(1, 3)], &catalog);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].name, "Product 1");
        assert_eq!(lines[0].unit_price, Decimal::new(4500, 2));
        assert_eq!(lines[0].stock, 7);
        assert_eq!(lines[0].quantity, 3);
        assert_eq!(lines[0].slug, "product-1");
        assert_eq!(
            lines[0].image.as_deref(),
            Some("https://cdn.hearth.test/1.jpg")
        );
    }

    #[test]
    fn test_refresh_drops_unknown_and_inactive_products() {
        let catalog = catalog(vec![summary(1, 1000, 5, true), summary(2, 1000, 5, false)]);

        let lines = refresh_lines(&[line(2, 1), line(1, 2), line(99, 4)], &catalog);
        let ids: Vec<ProductId> = lines.iter().map(|l| l.product_id).collect();
        assert_eq!(ids, vec![ProductId::new(1)]);
    }

    #[test]
    fn test_refreshed_lines_load_within_stock() {
        let catalog = catalog(vec![summary(1, 1000, 2, true), summary(3, 250, 0, true)]);

        let lines = refresh_lines(&[line(1, 10), line(3, 1)], &catalog);
        let cart = Cart::new().reduce(CartAction::Load(lines));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(cart.total(), Decimal::new(2000, 2));
    }
}
