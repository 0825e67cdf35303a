//! Core types for Basket.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod locale;
pub mod money;
pub mod principal;

pub use email::{Email, EmailError};
pub use id::*;
pub use locale::{Locale, LocaleError};
pub use money::{CurrencyCode, Money, MoneyError};
pub use principal::Principal;
