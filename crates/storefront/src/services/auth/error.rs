//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] hearth_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password login attempted before the email was verified.
    #[error("email address has not been verified")]
    EmailNotVerified,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// One-time code is wrong, consumed, or was never issued.
    #[error("invalid or expired code")]
    InvalidCode,

    /// One-time code is past its expiry.
    #[error("invalid or expired code")]
    CodeExpired,

    /// Too many wrong guesses against the current code.
    #[error("too many attempts, request a new code")]
    TooManyAttempts,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// One-time code hashing error.
    #[error("code hashing error")]
    CodeHash,

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
