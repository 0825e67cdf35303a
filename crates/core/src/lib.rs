//! Basket Core - Shared types library.
//!
//! This crate provides common types used across all Basket components:
//! - `storefront` - Public-facing cart, shopping list and account site
//! - `cli` - Command-line tools for session migrations and catalog checks
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, principals, locales, money and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
