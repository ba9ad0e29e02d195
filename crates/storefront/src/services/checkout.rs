//! Checkout: turn the session cart into a pending order and a PaymentIntent,
//! then settle the order once the intent succeeds.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use hearth_core::{Cart, CurrencyCode, OrderId, OrderStatus, Price, PriceError, ProductId};

use crate::db::orders::NewOrderItem;
use crate::db::{OrderRepository, ProductRepository, RepositoryError};
use crate::models::{CurrentUser, OrderDetail, ProductSummary};
use crate::services::stripe::{
    NewPaymentIntent, PaymentIntent, PaymentIntentStatus, StripeClient, StripeError,
};

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    /// Product was deleted or deactivated since it was added.
    #[error("{0} is no longer available")]
    Unavailable(String),

    #[error("only {available} of {product} left in stock")]
    InsufficientStock { product: String, available: i32 },

    #[error("invalid order total: {0}")]
    Price(#[from] PriceError),

    /// Payment intent does not exist or belongs to someone else.
    #[error("payment not found")]
    NotFound,

    /// Intent amount, currency or order metadata differs from the order it
    /// points to.
    #[error("payment does not match order {0}")]
    AmountMismatch(OrderId),

    #[error("payment provider error: {0}")]
    Stripe(#[from] StripeError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Response to the client for starting payment.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentSession {
    pub order_id: OrderId,
    pub payment_intent_id: String,
    pub client_secret: String,
    /// Amount in minor units.
    pub amount: i64,
    pub currency: String,
}

/// Result of reconciling an order with its PaymentIntent.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentOutcome {
    pub status: PaymentIntentStatus,
    pub order: OrderDetail,
    /// Whether this call moved the order to `paid`.
    #[serde(skip)]
    pub newly_paid: bool,
}

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    stripe: &'a StripeClient,
    currency: CurrencyCode,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, stripe: &'a StripeClient, currency: CurrencyCode) -> Self {
        Self {
            pool,
            stripe,
            currency,
        }
    }

    /// Create a pending order from the cart and a PaymentIntent for its total.
    ///
    /// Prices and availability come from the catalog, not the cart snapshot.
    ///
    /// # Errors
    ///
    /// Returns a `CheckoutError` describing the first line that cannot be
    /// bought, or a provider/database failure.
    #[tracing::instrument(skip(self, user, cart), fields(user_id = %user.id, lines = cart.items().len()))]
    pub async fn start_payment(
        &self,
        user: &CurrentUser,
        cart: &Cart,
    ) -> Result<PaymentSession, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let ids: Vec<ProductId> = cart.items().iter().map(|l| l.product_id).collect();
        let products = ProductRepository::new(self.pool).get_many(&ids).await?;
        let (items, total) = price_lines(cart, &products)?;
        let amount = Price::new(total, self.currency).to_minor_units()?;

        let orders = OrderRepository::new(self.pool);
        let order = orders
            .create_pending(user.id, self.currency.code(), total, &items)
            .await?;
        let order_id = order.order.id;

        let intent = match self
            .stripe
            .create_payment_intent(&NewPaymentIntent {
                order_id,
                amount,
                currency: self.currency.stripe_code(),
                receipt_email: Some(user.email.as_str()),
            })
            .await
        {
            Ok(intent) => intent,
            Err(e) => {
                if let Err(cancel_err) = orders
                    .update_status(order_id, OrderStatus::Pending, OrderStatus::Cancelled)
                    .await
                {
                    tracing::error!(order_id = %order_id, error = %cancel_err, "Failed to cancel order after payment error");
                }
                return Err(e.into());
            }
        };

        orders.set_payment_intent(order_id, &intent.id).await?;
        let client_secret = intent
            .client_secret
            .ok_or_else(|| StripeError::Parse("payment intent without client_secret".to_string()))?;

        tracing::info!(order_id = %order_id, payment_intent = %intent.id, amount, "Payment started");

        Ok(PaymentSession {
            order_id,
            payment_intent_id: intent.id,
            client_secret,
            amount,
            currency: intent.currency,
        })
    }

    /// Read a PaymentIntent and bring its order up to date.
    ///
    /// A succeeded intent settles a pending order (status and stock in one
    /// transaction); a canceled intent cancels it.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::NotFound` if the intent is unknown or the
    /// order belongs to another user.
    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn sync_payment(
        &self,
        user: &CurrentUser,
        payment_intent_id: &str,
    ) -> Result<PaymentOutcome, CheckoutError> {
        let orders = OrderRepository::new(self.pool);

        let order = orders
            .get_by_payment_intent(payment_intent_id)
            .await?
            .ok_or(CheckoutError::NotFound)?;
        if order.user_id != Some(user.id) {
            return Err(CheckoutError::NotFound);
        }

        let intent = match self.stripe.retrieve_payment_intent(payment_intent_id).await {
            Ok(intent) => intent,
            Err(StripeError::InvalidId) => return Err(CheckoutError::NotFound),
            Err(e) => return Err(e.into()),
        };

        let expected = Price::new(order.total, self.currency).to_minor_units()?;
        if !intent_matches(&intent, order.id, expected, &order.currency) {
            tracing::error!(
                order_id = %order.id,
                intent_order_id = ?intent.order_id(),
                intent_amount = intent.amount,
                expected,
                "Payment intent does not match order"
            );
            return Err(CheckoutError::AmountMismatch(order.id));
        }

        let mut newly_paid = false;
        if order.status == OrderStatus::Pending {
            match intent.status {
                PaymentIntentStatus::Succeeded => {
                    newly_paid = orders.mark_paid(order.id).await?;
                    if newly_paid {
                        tracing::info!(order_id = %order.id, "Order paid");
                    }
                }
                PaymentIntentStatus::Canceled => {
                    orders
                        .update_status(order.id, OrderStatus::Pending, OrderStatus::Cancelled)
                        .await?;
                    tracing::info!(order_id = %order.id, "Order cancelled with its payment");
                }
                _ => {}
            }
        }

        let order = orders
            .get_detail(order.id)
            .await?
            .ok_or(CheckoutError::NotFound)?;

        Ok(PaymentOutcome {
            status: intent.status,
            order,
            newly_paid,
        })
    }
}

/// Whether an intent was created for this order at this amount.
fn intent_matches(intent: &PaymentIntent, order_id: OrderId, amount: i64, currency: &str) -> bool {
    intent.order_id() == Some(order_id)
        && intent.amount == amount
        && intent.currency.eq_ignore_ascii_case(currency)
}

/// Price every cart line from the catalog and check availability.
fn price_lines(
    cart: &Cart,
    products: &[ProductSummary],
) -> Result<(Vec<NewOrderItem>, Decimal), CheckoutError> {
    let by_id: HashMap<ProductId, &ProductSummary> =
        products.iter().map(|p| (p.product.id, p)).collect();

    let mut items = Vec::with_capacity(cart.items().len());
    let mut total = Decimal::ZERO;

    for line in cart.items() {
        let product = match by_id.get(&line.product_id) {
            Some(p) if p.product.is_active => &p.product,
            _ => return Err(CheckoutError::Unavailable(line.name.clone())),
        };

        let quantity = i32::try_from(line.quantity).unwrap_or(i32::MAX);
        if product.stock < quantity {
            return Err(CheckoutError::InsufficientStock {
                product: product.name.clone(),
                available: product.stock,
            });
        }

        total = total.saturating_add(product.price.saturating_mul(Decimal::from(quantity)));
        items.push(NewOrderItem {
            product_id: product.id,
            product_name: product.name.clone(),
            unit_price: product.price,
            quantity,
        });
    }

    Ok((items, total))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use hearth_core::{CartAction, ProductSnapshot, Slug};

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
            image: None,
            category_slug: None,
        }
    }

    fn cart_with(lines: &[(i32, i64, u32, u32)]) -> Cart {
        let mut cart = Cart::new();
        for &(id, cents, stock, quantity) in lines {
            let snapshot = ProductSnapshot {
                product_id: ProductId::new(id),
                name: format!("Product {id}"),
                unit_price: Decimal::new(cents, 2),
                image: None,
                slug: format!("product-{id}"),
                stock,
            };
            cart.apply(CartAction::Add(snapshot));
            cart.apply(CartAction::SetQuantity {
                product_id: ProductId::new(id),
                quantity: i64::from(quantity),
            });
        }
        cart
    }

    #[test]
    fn test_prices_come_from_catalog() {
        // Cart snapshot says 10.00, catalog now says 12.50.
        let cart = cart_with(&[(1, 1000, 5, 2), (2, 300, 9, 1)]);
        let products = vec![summary(1, 1250, 5, true), summary(2, 300, 9, true)];

        let (items, total) = price_lines(&cart, &products).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].unit_price, Decimal::new(1250, 2));
        assert_eq!(total, Decimal::new(2800, 2));
    }

    #[test]
    fn test_missing_or_inactive_product_is_unavailable() {
        let cart = cart_with(&[(1, 1000, 5, 1)]);

        assert!(matches!(
            price_lines(&cart, &[]),
            Err(CheckoutError::Unavailable(name)) if name == "Product 1"
        ));
        assert!(matches!(
            price_lines(&cart, &[summary(1, 1000, 5, false)]),
            Err(CheckoutError::Unavailable(_))
        ));
    }

    #[test]
    fn test_stock_dropped_below_cart_quantity() {
        let cart = cart_with(&[(1, 1000, 5, 4)]);
        let err = price_lines(&cart, &[summary(1, 1000, 3, true)]).unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::InsufficientStock { available: 3, .. }
        ));
    }

    fn intent(order_id: Option<&str>, amount: i64, currency: &str) -> PaymentIntent {
        PaymentIntent {
            id: "pi_3MtwBwLkdIwHu7ix28a3tqPa".to_string(),
            amount,
            currency: currency.to_string(),
            status: PaymentIntentStatus::Succeeded,
            client_secret: None,
            metadata: order_id
                .map(|id| HashMap::from([("order_id".to_string(), id.to_string())]))
                .unwrap_or_default(),
        }
    }

    #[test]
    fn test_intent_must_point_at_the_order() {
        let order = OrderId::new(42);

        assert!(intent_matches(&intent(Some("42"), 2599, "usd"), order, 2599, "USD"));
        assert!(!intent_matches(&intent(Some("41"), 2599, "usd"), order, 2599, "USD"));
        assert!(!intent_matches(&intent(None, 2599, "usd"), order, 2599, "USD"));
    }

    #[test]
    fn test_intent_amount_and_currency_must_match() {
        let order = OrderId::new(42);

        assert!(!intent_matches(&intent(Some("42"), 2500, "usd"), order, 2599, "USD"));
        assert!(!intent_matches(&intent(Some("42"), 2599, "eur"), order, 2599, "USD"));
    }
}
