//! Property-based tests for the cart reducer.
//!
//! Random action sequences over a small product universe so that the same
//! products are hit repeatedly by add, remove and set-quantity.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use rust_decimal::Decimal;

use hearth_core::cart::OwnerChange;
use hearth_core::{Cart, CartAction, OwnedCart, ProductId, ProductSnapshot, UserId};

/// Generates a catalog snapshot for one of five products.
fn arb_snapshot() -> impl Strategy<Value = ProductSnapshot> {
    (1i32..=5, 0i64..100_000, 0u32..8).prop_map(|(id, cents, stock)| ProductSnapshot {
        product_id: ProductId::new(id),
        name: format!("Product {id}"),
        unit_price: Decimal::new(cents, 2),
        image: Some(format!("https://img.example.com/{id}.jpg")),
        slug: format!("product-{id}"),
        stock,
    })
}

/// Generates an add, remove or set-quantity action.
fn arb_action() -> impl Strategy<Value = CartAction> {
    prop_oneof![
        4 => arb_snapshot().prop_map(CartAction::Add),
        1 => (1i32..=5).prop_map(|id| CartAction::Remove(ProductId::new(id))),
        2 => (1i32..=5, -3i64..12).prop_map(|(id, quantity)| CartAction::SetQuantity {
            product_id: ProductId::new(id),
            quantity,
        }),
    ]
}

fn run(actions: Vec<CartAction>) -> Cart {
    actions.into_iter().fold(Cart::new(), Cart::reduce)
}

proptest! {
    #[test]
    fn quantity_never_exceeds_stock(actions in prop::collection::vec(arb_action(), 0..60)) {
        let cart = run(actions);
        for line in cart.items() {
            prop_assert!(line.quantity >= 1);
            prop_assert!(line.quantity <= line.stock);
        }
    }

    #[test]
    fn total_is_sum_of_line_subtotals(actions in prop::collection::vec(arb_action(), 0..60)) {
        let cart = run(actions);
        let expected: Decimal = cart
            .items()
            .iter()
            .map(|l| l.unit_price * Decimal::from(l.quantity))
            .sum();
        prop_assert_eq!(cart.total(), expected);
    }

    #[test]
    fn item_count_is_sum_of_quantities(actions in prop::collection::vec(arb_action(), 0..60)) {
        let cart = run(actions);
        let expected: u32 = cart.items().iter().map(|l| l.quantity).sum();
        prop_assert_eq!(cart.item_count(), expected);
    }

    #[test]
    fn products_are_unique(actions in prop::collection::vec(arb_action(), 0..60)) {
        let cart = run(actions);
        let mut ids: Vec<ProductId> = cart.items().iter().map(|l| l.product_id).collect();
        ids.sort();
        ids.dedup();
        prop_assert_eq!(ids.len(), cart.items().len());
    }

    #[test]
    fn remove_and_zero_quantity_delete_the_line(
        actions in prop::collection::vec(arb_action(), 0..40),
        id in 1i32..=5,
        quantity in -5i64..=0,
        use_remove in any::<bool>(),
    ) {
        let product_id = ProductId::new(id);
        let action = if use_remove {
            CartAction::Remove(product_id)
        } else {
            CartAction::SetQuantity { product_id, quantity }
        };

        let cart = run(actions).reduce(action);
        prop_assert!(cart.line(product_id).is_none());
    }

    #[test]
    fn reloading_a_saved_cart_reproduces_totals(actions in prop::collection::vec(arb_action(), 0..60)) {
        let cart = run(actions);

        let json = serde_json::to_string(&cart).unwrap();
        let restored: Cart = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(restored.total(), cart.total());
        prop_assert_eq!(restored.item_count(), cart.item_count());

        let reloaded = Cart::new().reduce(CartAction::Load(cart.items().to_vec()));
        prop_assert_eq!(reloaded, cart);
    }

    #[test]
    fn changing_user_clears_the_cart(
        actions in prop::collection::vec(arb_action(), 0..40),
        first in 1i32..1000,
        offset in 1i32..1000,
    ) {
        let mut owned = OwnedCart {
            owner: Some(UserId::new(first)),
            cart: run(actions),
        };

        let change = owned.reconcile_owner(Some(UserId::new(first + offset)));
        prop_assert_eq!(change, OwnerChange::Cleared);
        prop_assert!(owned.cart.is_empty());
        prop_assert_eq!(owned.cart.item_count(), 0);
        prop_assert_eq!(owned.cart.total(), Decimal::ZERO);
    }
}
