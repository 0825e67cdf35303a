//! Session-stored models for the storefront.

pub mod session;

pub use session::{CurrentCustomer, FlashLevel, FlashMessage, keys as session_keys};
