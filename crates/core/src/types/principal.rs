//! The acting identity behind a request.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::types::id::{CustomerId, SessionId};

/// Who is acting: an anonymous visitor identified by their session, or a
/// signed-in customer. Carts and shopping lists are owned by exactly one
/// principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Principal {
    /// Visitor without an authenticated customer.
    Anonymous {
        /// Stable per-visitor session id.
        session_id: SessionId,
    },
    /// Authenticated customer.
    Customer {
        /// Customer id on the commerce platform.
        customer_id: CustomerId,
    },
}

impl Principal {
    /// Anonymous principal for a session.
    #[must_use]
    pub fn anonymous(session_id: impl Into<SessionId>) -> Self {
        Self::Anonymous {
            session_id: session_id.into(),
        }
    }

    /// Principal for a signed-in customer.
    #[must_use]
    pub fn customer(customer_id: impl Into<CustomerId>) -> Self {
        Self::Customer {
            customer_id: customer_id.into(),
        }
    }

    /// The customer id, if this principal is authenticated.
    #[must_use]
    pub const fn customer_id(&self) -> Option<&CustomerId> {
        match self {
            Self::Customer { customer_id } => Some(customer_id),
            Self::Anonymous { .. } => None,
        }
    }

    /// The anonymous session id, if this principal is not authenticated.
    #[must_use]
    pub const fn session_id(&self) -> Option<&SessionId> {
        match self {
            Self::Anonymous { session_id } => Some(session_id),
            Self::Customer { .. } => None,
        }
    }

    /// Whether this is an authenticated customer.
    #[must_use]
    pub const fn is_customer(&self) -> bool {
        matches!(self, Self::Customer { .. })
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous { session_id } => write!(f, "anonymous:{session_id}"),
            Self::Customer { customer_id } => write!(f, "customer:{customer_id}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_are_exclusive() {
        let anon = Principal::anonymous("sess1");
        assert_eq!(anon.session_id().map(SessionId::as_str), Some("sess1"));
        assert!(anon.customer_id().is_none());
        assert!(!anon.is_customer());

        let customer = Principal::customer("c-1");
        assert_eq!(customer.customer_id().map(CustomerId::as_str), Some("c-1"));
        assert!(customer.session_id().is_none());
    }

    #[test]
    fn test_same_raw_id_is_not_same_principal() {
        assert_ne!(Principal::anonymous("x"), Principal::customer("x"));
    }

    #[test]
    fn test_serde_tagging() {
        let json = serde_json::to_value(Principal::customer("c-9")).unwrap();
        assert_eq!(json["type"], "customer");
        assert_eq!(json["customer_id"], "c-9");
    }
}
