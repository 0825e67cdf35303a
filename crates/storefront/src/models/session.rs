//! Session-related types.
//!
//! Everything the storefront keeps per visitor lives in the session; carts,
//! lists and customers themselves live on the commerce platform.

use serde::{Deserialize, Serialize};

use basket_core::{CustomerId, Email};

/// Session-stored customer identity.
///
/// Minimal data stored in the session to identify the signed-in customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentCustomer {
    /// Customer id on the commerce platform.
    pub id: CustomerId,
    /// Customer's email address, for display.
    pub email: Email,
}

/// Severity of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Error,
}

impl FlashLevel {
    /// CSS modifier used by the layout template.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Error => "error",
        }
    }
}

/// A one-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub text: String,
}

impl FlashMessage {
    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Info,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            text: text.into(),
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for the anonymous visitor id, created on first visit.
    pub const VISITOR_ID: &str = "visitor_id";

    /// Key for the id of the visitor's active cart.
    pub const CART_ID: &str = "cart_id";

    /// Key for storing the current signed-in customer.
    pub const CURRENT_CUSTOMER: &str = "current_customer";

    /// Key for pending flash messages.
    pub const FLASH: &str = "flash";
}
