//! Authentication route handlers.
//!
//! JSON endpoints for registration, email verification, password login and
//! password management. Signing in stores a [`CurrentUser`] in the session.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::extract::Json;
use crate::middleware::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::AuthService;
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Registration request.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

/// Password login request.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request carrying only an email address.
#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

/// Verification code submission.
#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

/// Password change for a signed-in user.
#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Password reset with an emailed code.
#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

// =============================================================================
// Response Types
// =============================================================================

/// Response after registration.
#[derive(Serialize)]
pub struct RegisterResponse {
    pub user: User,
    /// Always `true`: the account must be verified before password login.
    pub verification_required: bool,
}

/// Response after signing in.
#[derive(Serialize)]
pub struct SessionResponse {
    pub user: CurrentUser,
}

#[derive(Serialize)]
struct Accepted {
    status: &'static str,
}

fn accepted() -> impl IntoResponse {
    (StatusCode::ACCEPTED, Json(Accepted { status: "accepted" }))
}

async fn sign_in(session: &Session, user: &User) -> Result<CurrentUser> {
    let current = CurrentUser::from(user);
    set_current_user(session, &current).await?;
    set_sentry_user(&current.id, Some(current.email.as_str()));
    Ok(current)
}

fn auth_service(state: &AppState) -> AuthService<'_> {
    AuthService::new(state.pool(), state.email(), &state.config().secret_key)
}

// =============================================================================
// Handlers
// =============================================================================

/// Create an unverified account and email a verification code.
#[instrument(skip(state, req))]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let user = auth_service(&state)
        .register(&req.email, &req.password, req.name.as_deref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user,
            verification_required: true,
        }),
    ))
}

/// (Re)send an email verification code. Always 202.
#[instrument(skip(state, req))]
pub async fn send_code(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<impl IntoResponse> {
    auth_service(&state).send_verification_code(&req.email).await?;
    Ok(accepted())
}

/// Verify an email code and sign the user in.
#[instrument(skip(state, session, req))]
pub async fn verify_code(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<VerifyCodeRequest>,
) -> Result<Json<SessionResponse>> {
    let user = auth_service(&state).verify_email(&req.email, &req.code).await?;
    let user = sign_in(&session, &user).await?;
    Ok(Json(SessionResponse { user }))
}

/// Password login.
#[instrument(skip(state, session, req))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    let user = auth_service(&state).login(&req.email, &req.password).await?;
    let user = sign_in(&session, &user).await?;

    tracing::info!(user_id = %user.id, "User signed in");
    Ok(Json(SessionResponse { user }))
}

/// Sign out. The session, and the cart in it, is discarded.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The signed-in user, or `null`.
pub async fn current_session(OptionalAuth(user): OptionalAuth) -> Json<Option<CurrentUser>> {
    Json(user)
}

/// Change password (signed in).
#[instrument(skip(state, user, req), fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<StatusCode> {
    auth_service(&state)
        .change_password(user.id, &req.current_password, &req.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Email a password reset code. Always 202.
#[instrument(skip(state, req))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<impl IntoResponse> {
    auth_service(&state).request_password_reset(&req.email).await?;
    Ok(accepted())
}

/// Set a new password with a reset code.
#[instrument(skip(state, req))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<StatusCode> {
    auth_service(&state)
        .reset_password(&req.email, &req.code, &req.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
