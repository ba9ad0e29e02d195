//! Authentication service.
//!
//! Email/password accounts with one-time codes for email verification and
//! password reset.

mod codes;
mod error;

pub use codes::{generate_code, hash_code, verify_code};
pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use secrecy::SecretString;
use sqlx::PgPool;

use hearth_core::{CodePurpose, Email, UserId, UserRole};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::db::verification_codes::VerificationCodeRepository;
use crate::models::User;
use crate::services::email::EmailService;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length accepted before hashing.
const MAX_PASSWORD_LENGTH: usize = 128;

/// One-time code lifetime.
const CODE_TTL_MINUTES: i64 = 10;

/// Wrong guesses allowed per code.
const MAX_CODE_ATTEMPTS: i32 = 5;

/// Authentication service.
///
/// Handles registration, password login, email verification and password
/// management.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    codes: VerificationCodeRepository<'a>,
    email: &'a EmailService,
    secret: &'a SecretString,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, email: &'a EmailService, secret: &'a SecretString) -> Self {
        Self {
            users: UserRepository::new(pool),
            codes: VerificationCodeRepository::new(pool),
            email,
            secret,
        }
    }

    // =========================================================================
    // Registration & verification
    // =========================================================================

    /// Register a new customer and email them a verification code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;
        let name = name.map(str::trim).filter(|n| !n.is_empty());

        let user = self
            .users
            .create_with_password(&email, name, &password_hash, UserRole::Customer)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "Registered new user");

        // The account exists now; a failed send is recoverable through a resend.
        let code = self.issue_code(&user.email, CodePurpose::VerifyEmail).await?;
        deliver_code(self.email, &user.email, CodePurpose::VerifyEmail, &code).await;

        Ok(user)
    }

    /// Send a fresh verification code to an unverified account.
    ///
    /// Succeeds silently for unknown or already verified addresses, and when
    /// delivery fails, so the outcome never depends on whether an account
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    pub async fn send_verification_code(&self, email: &str) -> Result<(), AuthError> {
        let email = Email::parse(email)?;

        match self.users.get_by_email(&email).await? {
            Some(user) if !user.email_verified => {
                let code = self.issue_code(&user.email, CodePurpose::VerifyEmail).await?;
                deliver_code(self.email, &user.email, CodePurpose::VerifyEmail, &code).await;
            }
            Some(_) => tracing::debug!("Verification requested for verified account"),
            None => tracing::debug!("Verification requested for unknown email"),
        }

        Ok(())
    }

    /// Check an email verification code and mark the address verified.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCode`, `CodeExpired` or `TooManyAttempts`
    /// when the code does not check out.
    pub async fn verify_email(&self, email: &str, code: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        self.check_code(&email, CodePurpose::VerifyEmail, code)
            .await?;

        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        let user = self.users.mark_email_verified(user.id).await?;

        tracing::info!(user_id = %user.id, "Email verified");
        Ok(user)
    }

    // =========================================================================
    // Password authentication
    // =========================================================================

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::EmailNotVerified` if the account is not verified yet.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let password_hash = self
            .users
            .get_password_hash(user.id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        if !user.email_verified {
            return Err(AuthError::EmailNotVerified);
        }

        Ok(user)
    }

    /// Change the password of a signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if `current` is wrong.
    /// Returns `AuthError::WeakPassword` if `new` doesn't meet requirements.
    pub async fn change_password(
        &self,
        user_id: UserId,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        let password_hash = self
            .users
            .get_password_hash(user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(current, &password_hash)?;

        validate_password(new)?;
        self.users
            .set_password(user_id, &hash_password(new)?)
            .await?;

        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    /// Email a password reset code if the account exists.
    ///
    /// Delivery failures are logged, not returned.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let email = Email::parse(email)?;

        if let Some(user) = self.users.get_by_email(&email).await? {
            let code = self.issue_code(&user.email, CodePurpose::ResetPassword).await?;
            deliver_code(self.email, &user.email, CodePurpose::ResetPassword, &code).await;
        } else {
            tracing::debug!("Password reset requested for unknown email");
        }

        Ok(())
    }

    /// Set a new password using a reset code.
    ///
    /// A successful reset also verifies the email, since the code proves
    /// control of the mailbox.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::InvalidCode`, `CodeExpired` or `TooManyAttempts`
    /// when the code does not check out.
    pub async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(new_password)?;

        self.check_code(&email, CodePurpose::ResetPassword, code)
            .await?;

        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        self.users
            .set_password(user.id, &hash_password(new_password)?)
            .await?;
        let user = if user.email_verified {
            user
        } else {
            self.users.mark_email_verified(user.id).await?
        };

        tracing::info!(user_id = %user.id, "Password reset");
        Ok(user)
    }

    // =========================================================================
    // One-time codes
    // =========================================================================

    async fn issue_code(&self, email: &Email, purpose: CodePurpose) -> Result<String, AuthError> {
        let code = generate_code();
        let hash = hash_code(self.secret, purpose, email, &code)?;
        let expires_at = Utc::now() + Duration::minutes(CODE_TTL_MINUTES);

        self.codes.issue(email, purpose, &hash, expires_at).await?;
        Ok(code)
    }

    async fn check_code(
        &self,
        email: &Email,
        purpose: CodePurpose,
        code: &str,
    ) -> Result<(), AuthError> {
        let stored = self
            .codes
            .latest_active(email, purpose)
            .await?
            .ok_or(AuthError::InvalidCode)?;

        if stored.attempts >= MAX_CODE_ATTEMPTS {
            return Err(AuthError::TooManyAttempts);
        }
        if stored.expires_at <= Utc::now() {
            return Err(AuthError::CodeExpired);
        }
        if !verify_code(self.secret, purpose, email, code, &stored.code_hash) {
            self.codes.record_attempt(stored.id).await?;
            return Err(AuthError::InvalidCode);
        }
        if !self.codes.consume(stored.id).await? {
            return Err(AuthError::InvalidCode);
        }

        Ok(())
    }
}

/// Email a one-time code. Failures are logged and reported as `false`;
/// callers answer the same way whether or not the message went out.
async fn deliver_code(email: &EmailService, to: &Email, purpose: CodePurpose, code: &str) -> bool {
    let result = match purpose {
        CodePurpose::VerifyEmail => email.send_verification_code(to, code).await,
        CodePurpose::ResetPassword => email.send_password_reset(to, code).await,
    };

    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(purpose = purpose.as_str(), error = %e, "Failed to send one-time code");
            false
        }
    }
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` describing the failed rule.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} bytes"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::EmailConfig;

    #[tokio::test]
    async fn test_code_delivery_failure_is_swallowed() {
        let unreachable = EmailService::new(
            reqwest::Client::new(),
            Some(EmailConfig {
                api_key: SecretString::from("re_test_key"),
                from_address: "Hearth Market <no-reply@hearth.test>".to_string(),
                api_base: "http://127.0.0.1:1".to_string(),
            }),
        );
        let to = Email::parse("known@hearth.test").unwrap();

        for purpose in [CodePurpose::VerifyEmail, CodePurpose::ResetPassword] {
            assert!(!deliver_code(&unreachable, &to, purpose, "123456").await);
        }
    }

    #[tokio::test]
    async fn test_code_delivery_reports_success() {
        let disabled = EmailService::new(reqwest::Client::new(), None);
        let to = Email::parse("known@hearth.test").unwrap();
        assert!(deliver_code(&disabled, &to, CodePurpose::VerifyEmail, "123456").await);
    }

    #[test]
    fn test_validate_password_length() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough").is_ok());
        assert!(validate_password(&"x".repeat(MAX_PASSWORD_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse battery", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hash_password_is_salted() {
        let a = hash_password("same password").unwrap();
        let b = hash_password("same password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_password_rejects_malformed_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
