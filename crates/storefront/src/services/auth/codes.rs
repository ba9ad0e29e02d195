//! One-time code generation and hashing.
//!
//! Codes are six decimal digits. The stored form is
//! `hex(HMAC-SHA256(secret, "{purpose}:{email}:{code}"))` so a leaked table
//! cannot be brute-forced without the server secret.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use hearth_core::{CodePurpose, Email};

use super::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Generate a 6-digit verification code.
#[must_use]
pub fn generate_code() -> String {
    use rand::Rng;
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

fn mac(
    secret: &SecretString,
    purpose: CodePurpose,
    email: &Email,
    code: &str,
) -> Result<HmacSha256, AuthError> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|_| AuthError::CodeHash)?;
    mac.update(purpose.as_str().as_bytes());
    mac.update(b":");
    mac.update(email.as_str().as_bytes());
    mac.update(b":");
    mac.update(code.as_bytes());
    Ok(mac)
}

/// Hash a code for storage.
///
/// # Errors
///
/// Returns `AuthError::CodeHash` if the MAC cannot be keyed.
pub fn hash_code(
    secret: &SecretString,
    purpose: CodePurpose,
    email: &Email,
    code: &str,
) -> Result<String, AuthError> {
    Ok(hex::encode(
        mac(secret, purpose, email, code)?.finalize().into_bytes(),
    ))
}

/// Constant-time comparison of a submitted code against a stored hash.
#[must_use]
pub fn verify_code(
    secret: &SecretString,
    purpose: CodePurpose,
    email: &Email,
    code: &str,
    stored_hash: &str,
) -> bool {
    let Ok(expected) = hex::decode(stored_hash) else {
        return false;
    };
    mac(secret, purpose, email, code.trim())
        .is_ok_and(|mac| mac.verify_slice(&expected).is_ok())
}
