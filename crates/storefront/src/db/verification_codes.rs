//! One-time code storage.
//!
//! Only the code hash is stored. Issuing a code consumes every earlier
//! unconsumed code for the same email and purpose.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use hearth_core::{CodePurpose, Email};

use super::RepositoryError;

/// A stored one-time code.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VerificationCode {
    pub id: i32,
    pub code_hash: String,
    pub attempts: i32,
    pub expires_at: DateTime<Utc>,
}

/// Repository for one-time codes.
pub struct VerificationCodeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> VerificationCodeRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new code hash, invalidating older ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn issue(
        &self,
        email: &Email,
        purpose: CodePurpose,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE shop.verification_code SET consumed_at = NOW()
             WHERE email = $1 AND purpose = $2 AND consumed_at IS NULL",
        )
        .bind(email)
        .bind(purpose)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO shop.verification_code (email, purpose, code_hash, expires_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(email)
        .bind(purpose)
        .bind(code_hash)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// The newest unconsumed code for an email and purpose, expired or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_active(
        &self,
        email: &Email,
        purpose: CodePurpose,
    ) -> Result<Option<VerificationCode>, RepositoryError> {
        let code = sqlx::query_as::<_, VerificationCode>(
            "SELECT id, code_hash, attempts, expires_at
             FROM shop.verification_code
             WHERE email = $1 AND purpose = $2 AND consumed_at IS NULL
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
        )
        .bind(email)
        .bind(purpose)
        .fetch_optional(self.pool)
        .await?;

        Ok(code)
    }

    /// Record a failed attempt.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record_attempt(&self, id: i32) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE shop.verification_code SET attempts = attempts + 1 WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Mark a code used. Returns `false` if it was already consumed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn consume(&self, id: i32) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE shop.verification_code SET consumed_at = NOW()
             WHERE id = $1 AND consumed_at IS NULL",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
