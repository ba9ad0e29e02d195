//! Shopping cart state.
//!
//! A [`Cart`] is a list of [`LineItem`]s plus two values derived from them:
//! the total price and the item count. Every mutation goes through
//! [`Cart::apply`] with a [`CartAction`], and the derived values are
//! recomputed from the full list afterwards, O(n) per action.
//!
//! # Invariants
//!
//! After any action:
//! - every line has `1 <= quantity <= stock`
//! - each product appears at most once
//! - `total == Σ unit_price × quantity`
//! - `item_count == Σ quantity`
//!
//! # Ownership
//!
//! A persisted cart is wrapped in an [`OwnedCart`] that remembers which user
//! it belongs to. When the signed-in identity changes the cart is cleared, so
//! one account's cart never shows up for another on a shared device.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{ProductId, UserId};

/// One product in the cart, with a snapshot of its catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub name: String,
    /// Unit price at the time the product was last added or refreshed.
    pub unit_price: Decimal,
    pub quantity: u32,
    pub image: Option<String>,
    pub slug: String,
    /// Stock ceiling: the most units of this product that may be in the cart.
    pub stock: u32,
}

impl LineItem {
    /// `unit_price × quantity`, saturating at `Decimal::MAX`.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price.saturating_mul(Decimal::from(self.quantity))
    }
}

/// Catalog data for a product being added to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub image: Option<String>,
    pub slug: String,
    pub stock: u32,
}

impl ProductSnapshot {
    fn into_line(self, quantity: u32) -> LineItem {
        LineItem {
            product_id: self.product_id,
            name: self.name,
            unit_price: self.unit_price,
            quantity,
            image: self.image,
            slug: self.slug,
            stock: self.stock,
        }
    }
}

/// A mutation of the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// Add one unit of a product, or insert it at quantity 1. Clamped to the
    /// snapshot's stock; the snapshot also refreshes the line's catalog data.
    Add(ProductSnapshot),
    /// Remove a product's line entirely.
    Remove(ProductId),
    /// Set a line's quantity, clamped to `[1, stock]`. Zero or below removes it.
    SetQuantity { product_id: ProductId, quantity: i64 },
    /// Remove every line.
    Clear,
    /// Replace all lines, e.g. when restoring a saved cart.
    Load(Vec<LineItem>),
}

/// Cart contents plus derived totals.
///
/// Deserializing ignores any stored totals and rebuilds them through
/// [`CartAction::Load`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredCart")]
pub struct Cart {
    items: Vec<LineItem>,
    total: Decimal,
    item_count: u32,
}

#[derive(Deserialize)]
struct StoredCart {
    #[serde(default)]
    items: Vec<LineItem>,
}

impl From<StoredCart> for Cart {
    fn from(stored: StoredCart) -> Self {
        Self::from_items(stored.items)
    }
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cart from saved lines (sanitized like [`CartAction::Load`]).
    #[must_use]
    pub fn from_items(items: Vec<LineItem>) -> Self {
        Self::new().reduce(CartAction::Load(items))
    }

    /// Apply an action, consuming and returning the cart.
    #[must_use]
    pub fn reduce(mut self, action: CartAction) -> Self {
        self.apply(action);
        self
    }

    /// Apply an action in place.
    pub fn apply(&mut self, action: CartAction) {
        match action {
            CartAction::Add(snapshot) => self.add(snapshot),
            CartAction::Remove(product_id) => self.items.retain(|l| l.product_id != product_id),
            CartAction::SetQuantity {
                product_id,
                quantity,
            } => self.set_quantity(product_id, quantity),
            CartAction::Clear => self.items.clear(),
            CartAction::Load(items) => self.items = sanitize(items),
        }
        self.recompute();
    }

    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    #[must_use]
    pub const fn total(&self) -> Decimal {
        self.total
    }

    #[must_use]
    pub const fn item_count(&self) -> u32 {
        self.item_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The line for a product, if it is in the cart.
    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&LineItem> {
        self.items.iter().find(|l| l.product_id == product_id)
    }

    fn position(&self, product_id: ProductId) -> Option<usize> {
        self.items.iter().position(|l| l.product_id == product_id)
    }

    fn add(&mut self, snapshot: ProductSnapshot) {
        let existing = self.position(snapshot.product_id);
        let current = existing
            .and_then(|index| self.items.get(index))
            .map_or(0, |line| line.quantity);
        let quantity = current.saturating_add(1).min(snapshot.stock);

        match (existing, quantity) {
            (Some(index), 0) => {
                self.items.remove(index);
            }
            (Some(index), quantity) => {
                if let Some(line) = self.items.get_mut(index) {
                    *line = snapshot.into_line(quantity);
                }
            }
            (None, 0) => {}
            (None, quantity) => self.items.push(snapshot.into_line(quantity)),
        }
    }

    fn set_quantity(&mut self, product_id: ProductId, quantity: i64) {
        let Some(index) = self.position(product_id) else {
            return;
        };

        let stock = self.items.get(index).map_or(0, |line| line.stock);
        if quantity <= 0 || stock == 0 {
            self.items.remove(index);
            return;
        }

        if let Some(line) = self.items.get_mut(index) {
            line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX).min(stock);
        }
    }

    fn recompute(&mut self) {
        self.total = self
            .items
            .iter()
            .fold(Decimal::ZERO, |acc, line| acc.saturating_add(line.subtotal()));
        self.item_count = self
            .items
            .iter()
            .fold(0_u32, |acc, line| acc.saturating_add(line.quantity));
    }
}

/// Merge duplicate products, clamp to stock and drop empty lines.
fn sanitize(items: Vec<LineItem>) -> Vec<LineItem> {
    let mut merged: Vec<LineItem> = Vec::with_capacity(items.len());
    for item in items {
        if let Some(existing) = merged.iter_mut().find(|l| l.product_id == item.product_id) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            merged.push(item);
        }
    }

    merged.retain_mut(|line| {
        line.quantity = line.quantity.min(line.stock);
        line.quantity > 0
    });
    merged
}

/// Result of [`OwnedCart::reconcile_owner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerChange {
    /// Same identity as before.
    Unchanged,
    /// A guest cart was claimed by the user who just signed in.
    Adopted,
    /// The previous owner is gone; the cart was emptied.
    Cleared,
}

/// A cart together with the identity it belongs to, as persisted between
/// requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedCart {
    /// `None` for a guest cart.
    pub owner: Option<UserId>,
    pub cart: Cart,
}

impl OwnedCart {
    /// Align the cart with the currently signed-in identity.
    ///
    /// A guest cart is adopted by a user who signs in. A cart that belongs to
    /// a user is cleared as soon as the identity is anything else, including
    /// signed out.
    pub fn reconcile_owner(&mut self, current: Option<UserId>) -> OwnerChange {
        if self.owner == current {
            return OwnerChange::Unchanged;
        }

        if self.owner.is_none() {
            self.owner = current;
            return OwnerChange::Adopted;
        }

        self.cart.apply(CartAction::Clear);
        self.owner = current;
        OwnerChange::Cleared
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn snapshot(id: i32, price: &str, stock: u32) -> ProductSnapshot {
        ProductSnapshot {
            product_id: ProductId::new(id),
            name: format!("Product {id}"),
            unit_price: Decimal::from_str(price).unwrap(),
            image: None,
            slug: format!("product-{id}"),
            stock,
        }
    }

    #[test]
    fn test_add_inserts_at_quantity_one() {
        let cart = Cart::new().reduce(CartAction::Add(snapshot(1, "9.99", 5)));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.line(ProductId::new(1)).unwrap().quantity, 1);
        assert_eq!(cart.total(), Decimal::from_str("9.99").unwrap());
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_add_increments_and_clamps_to_stock() {
        let mut cart = Cart::new();
        for _ in 0..5 {
            cart.apply(CartAction::Add(snapshot(1, "2.50", 3)));
        }
        assert_eq!(cart.line(ProductId::new(1)).unwrap().quantity, 3);
        assert_eq!(cart.total(), Decimal::from_str("7.50").unwrap());
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_add_out_of_stock_is_noop() {
        let cart = Cart::new().reduce(CartAction::Add(snapshot(1, "1.00", 0)));
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    #[test]
    fn test_add_refreshes_snapshot_and_reclamps() {
        let mut cart = Cart::new();
        cart.apply(CartAction::Add(snapshot(1, "10.00", 10)));
        cart.apply(CartAction::SetQuantity {
            product_id: ProductId::new(1),
            quantity: 8,
        });

        // Stock dropped to 4 and the price changed since the last add.
        cart.apply(CartAction::Add(snapshot(1, "12.00", 4)));
        let line = cart.line(ProductId::new(1)).unwrap();
        assert_eq!(line.quantity, 4);
        assert_eq!(line.unit_price, Decimal::from_str("12.00").unwrap());
        assert_eq!(cart.total(), Decimal::from_str("48.00").unwrap());

        // Product sold out entirely.
        cart.apply(CartAction::Add(snapshot(1, "12.00", 0)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove() {
        let mut cart = Cart::new();
        cart.apply(CartAction::Add(snapshot(1, "1.00", 5)));
        cart.apply(CartAction::Add(snapshot(2, "2.00", 5)));
        cart.apply(CartAction::Remove(ProductId::new(1)));
        assert!(cart.line(ProductId::new(1)).is_none());
        assert_eq!(cart.total(), Decimal::from_str("2.00").unwrap());

        // Removing something absent changes nothing.
        let before = cart.clone();
        cart.apply(CartAction::Remove(ProductId::new(99)));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_set_quantity_clamps() {
        let mut cart = Cart::new().reduce(CartAction::Add(snapshot(1, "3.00", 6)));
        cart.apply(CartAction::SetQuantity {
            product_id: ProductId::new(1),
            quantity: 100,
        });
        assert_eq!(cart.line(ProductId::new(1)).unwrap().quantity, 6);
        assert_eq!(cart.item_count(), 6);

        cart.apply(CartAction::SetQuantity {
            product_id: ProductId::new(1),
            quantity: i64::MAX,
        });
        assert_eq!(cart.line(ProductId::new(1)).unwrap().quantity, 6);
    }

    #[test]
    fn test_set_quantity_zero_or_negative_removes() {
        for quantity in [0, -1, i64::MIN] {
            let mut cart = Cart::new().reduce(CartAction::Add(snapshot(1, "3.00", 6)));
            cart.apply(CartAction::SetQuantity {
                product_id: ProductId::new(1),
                quantity,
            });
            assert!(cart.is_empty(), "quantity {quantity} should remove the line");
            assert_eq!(cart.item_count(), 0);
        }
    }

    #[test]
    fn test_set_quantity_unknown_product_is_noop() {
        let mut cart = Cart::new().reduce(CartAction::Add(snapshot(1, "3.00", 6)));
        let before = cart.clone();
        cart.apply(CartAction::SetQuantity {
            product_id: ProductId::new(2),
            quantity: 3,
        });
        assert_eq!(cart, before);
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::new();
        cart.apply(CartAction::Add(snapshot(1, "1.00", 5)));
        cart.apply(CartAction::Add(snapshot(2, "1.00", 5)));
        cart.apply(CartAction::Clear);
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
        assert_eq!(cart.item_count(), 0);
    }

    #[test]
    fn test_load_sanitizes() {
        let line = |id: i32, quantity: u32, stock: u32| LineItem {
            quantity,
            ..snapshot(id, "1.00", stock).into_line(0)
        };

        let cart = Cart::from_items(vec![
            line(1, 9, 4),  // clamped to 4
            line(2, 0, 4),  // dropped
            line(3, 2, 0),  // dropped
            line(4, 1, 10), // merged with the next entry
            line(4, 2, 10),
        ]);

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.line(ProductId::new(1)).unwrap().quantity, 4);
        assert_eq!(cart.line(ProductId::new(4)).unwrap().quantity, 3);
        assert_eq!(cart.item_count(), 7);
        assert_eq!(cart.total(), Decimal::from_str("7.00").unwrap());
    }

    #[test]
    fn test_deserialize_recomputes_totals() {
        let mut cart = Cart::new();
        cart.apply(CartAction::Add(snapshot(1, "4.25", 5)));
        cart.apply(CartAction::Add(snapshot(1, "4.25", 5)));

        let mut json: serde_json::Value = serde_json::to_value(&cart).unwrap();
        assert_eq!(json["item_count"], 2);

        // Tampered totals are ignored on the way back in.
        json["total"] = serde_json::json!("1000.00");
        json["item_count"] = serde_json::json!(99);
        let restored: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(restored, cart);
    }

    #[test]
    fn test_owner_adopts_guest_cart() {
        let mut owned = OwnedCart::default();
        owned.cart.apply(CartAction::Add(snapshot(1, "1.00", 5)));

        let change = owned.reconcile_owner(Some(UserId::new(7)));
        assert_eq!(change, OwnerChange::Adopted);
        assert_eq!(owned.owner, Some(UserId::new(7)));
        assert_eq!(owned.cart.item_count(), 1);
    }

    #[test]
    fn test_owner_change_clears_cart() {
        let mut owned = OwnedCart {
            owner: Some(UserId::new(7)),
            cart: Cart::new().reduce(CartAction::Add(snapshot(1, "1.00", 5))),
        };

        assert_eq!(
            owned.reconcile_owner(Some(UserId::new(7))),
            OwnerChange::Unchanged
        );
        assert_eq!(owned.cart.item_count(), 1);

        assert_eq!(
            owned.reconcile_owner(Some(UserId::new(8))),
            OwnerChange::Cleared
        );
        assert!(owned.cart.is_empty());
        assert_eq!(owned.owner, Some(UserId::new(8)));
    }

    #[test]
    fn test_sign_out_clears_cart() {
        let mut owned = OwnedCart {
            owner: Some(UserId::new(7)),
            cart: Cart::new().reduce(CartAction::Add(snapshot(1, "1.00", 5))),
        };

        assert_eq!(owned.reconcile_owner(None), OwnerChange::Cleared);
        assert!(owned.cart.is_empty());
        assert_eq!(owned.owner, None);
    }
}
