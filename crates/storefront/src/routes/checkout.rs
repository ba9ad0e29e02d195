//! Checkout route handlers.

use axum::extract::State;
use tower_sessions::Session;
use tracing::instrument;

use hearth_core::CartAction;

use crate::error::Result;
use crate::extract::{Json, Path};
use crate::middleware::RequireAuth;
use crate::routes::cart::{load_cart, save_cart};
use crate::services::CheckoutService;
use crate::services::checkout::{PaymentOutcome, PaymentSession};
use crate::state::AppState;

fn checkout_service(state: &AppState) -> CheckoutService<'_> {
    CheckoutService::new(state.pool(), state.stripe(), state.config().currency)
}

/// Create a pending order from the session cart and start payment.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Json<PaymentSession>> {
    let owned = load_cart(&session, Some(user.id)).await?;
    let payment = checkout_service(&state)
        .start_payment(&user, &owned.cart)
        .await?;
    Ok(Json(payment))
}

/// Read a payment's state and settle its order when it has succeeded.
///
/// The first call that observes success clears the cart and sends the
/// receipt; later calls only report.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn payment_intent_status(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(payment_intent_id): Path<String>,
) -> Result<Json<PaymentOutcome>> {
    let outcome = checkout_service(&state)
        .sync_payment(&user, &payment_intent_id)
        .await?;

    if outcome.newly_paid {
        let mut owned = load_cart(&session, Some(user.id)).await?;
        owned.cart.apply(CartAction::Clear);
        save_cart(&session, &owned).await?;

        if let Err(e) = state
            .email()
            .send_order_confirmation(&user.email, &outcome.order, state.config().currency)
            .await
        {
            tracing::error!(order_id = %outcome.order.order.id, error = %e, "Failed to send order confirmation");
        }
    }

    Ok(Json(outcome))
}
