//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use hearth_core::{Email, UserId, UserRole};

/// A storefront account.
///
/// The password hash is never loaded into this type; see
/// `UserRepository::get_password_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: Option<String>,
    pub role: UserRole,
    /// Whether the email address has been confirmed with a one-time code.
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
