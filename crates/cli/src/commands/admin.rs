//! Admin user management commands.
//!
//! There is no way to become an admin through the API, so the first admin
//! is always created here.

use hearth_core::{Email, UserRole};
use hearth_storefront::db::{RepositoryError, UserRepository};
use hearth_storefront::services::auth::{AuthError, hash_password, validate_password};
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Password rejected or could not be hashed.
    #[error("{0}")]
    Password(#[from] AuthError),

    /// User already exists.
    #[error("User already exists with email: {0}")]
    UserExists(String),

    /// No user with this email.
    #[error("No user with email: {0}")]
    UserNotFound(String),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Create a new admin user with a verified email.
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns an error if the input is invalid, the email is taken, or the
/// database is unreachable.
pub async fn create_user(
    email: &str,
    name: Option<&str>,
    password: &str,
) -> Result<i32, AdminError> {
    let email = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    validate_password(password)?;
    let password_hash = hash_password(password)?;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    if users.get_by_email(&email).await?.is_some() {
        return Err(AdminError::UserExists(email.to_string()));
    }

    tracing::info!("Creating admin user: {}", email);

    let user = users
        .create_with_password(&email, name, &password_hash, UserRole::Admin)
        .await?;
    let user = users.mark_email_verified(user.id).await?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );

    Ok(user.id.as_i32())
}

/// Give an existing user the admin role.
///
/// # Errors
///
/// Returns an error if the user doesn't exist or the database is unreachable.
pub async fn promote(email: &str) -> Result<(), AdminError> {
    let email = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    let user = users
        .get_by_email(&email)
        .await?
        .ok_or_else(|| AdminError::UserNotFound(email.to_string()))?;

    if user.role.is_admin() {
        tracing::warn!("{} is already an admin", user.email);
        return Ok(());
    }

    users.update(user.id, Some(UserRole::Admin), None).await?;
    tracing::info!("Promoted {} (ID {}) to admin", user.email, user.id);
    Ok(())
}
