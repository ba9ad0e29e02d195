//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Registration, password login, one-time codes
//! - `email` - Transactional email through a hosted API
//! - `stripe` - PaymentIntent client
//! - `checkout` - Cart to order to payment
//! - `catalog_cache` - TTL cache for the category list

pub mod auth;
pub mod catalog_cache;
pub mod checkout;
pub mod email;
pub mod stripe;

pub use auth::{AuthError, AuthService};
pub use catalog_cache::CategoryCache;
pub use checkout::{CheckoutError, CheckoutService};
pub use email::{EmailError, EmailService};
pub use stripe::{StripeClient, StripeError};
