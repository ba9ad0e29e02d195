//! Hearth Market Core - Shared types library.
//!
//! This crate provides the types shared by every Hearth Market component:
//! - `storefront` - JSON API server for the catalog, cart, checkout and back office
//! - `cli` - Command-line tools for migrations, admin accounts and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. The shopping cart reducer lives here so it can be
//! exercised exhaustively without a running server.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses
//! - [`cart`] - Shopping cart state and the actions that mutate it

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::{Cart, CartAction, LineItem, OwnedCart, ProductSnapshot};
pub use types::*;
