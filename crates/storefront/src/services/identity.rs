//! Identity resolution.

use basket_core::{CustomerId, Principal, SessionId};

/// The identity facts known about a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Signed-in customer, if any.
    pub customer_id: Option<CustomerId>,
    /// Stable per-visitor id kept in the session.
    pub session_id: SessionId,
}

impl RequestContext {
    /// The principal acting for this request.
    #[must_use]
    pub fn principal(&self) -> Principal {
        resolve(self)
    }
}

/// A signed-in customer acts as themselves; everyone else acts as their
/// anonymous session.
#[must_use]
pub fn resolve(context: &RequestContext) -> Principal {
    match &context.customer_id {
        Some(customer_id) => Principal::Customer {
            customer_id: customer_id.clone(),
        },
        None => Principal::Anonymous {
            session_id: context.session_id.clone(),
        },
    }
}
