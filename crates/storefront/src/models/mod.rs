//! Domain models for the storefront.
//!
//! Row types double as domain types: every field is either a plain column
//! type or a `hearth-core` newtype with its own `sqlx` codec.

pub mod catalog;
pub mod order;
pub mod session;
pub mod user;

pub use catalog::{Category, Product, ProductDetail, ProductImage, ProductSummary};
pub use order::{Order, OrderDetail, OrderItem};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
