//! Visitor identity extractor.
//!
//! Every visitor gets a random id on the first request that needs one. The
//! id is kept in the session and names the anonymous principal that owns the
//! visitor's carts and lists until they sign in.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;
use tracing::{Span, debug, warn};
use uuid::Uuid;

use basket_core::{Principal, SessionId};

use crate::middleware::auth::{AuthRejection, current_customer};
use crate::models::session_keys;
use crate::services::RequestContext;

/// The identity of the current request.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(visitor: Visitor) -> impl IntoResponse {
///     format!("acting as {}", visitor.principal())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Visitor(pub RequestContext);

impl Visitor {
    /// The principal acting for this request.
    #[must_use]
    pub fn principal(&self) -> Principal {
        self.0.principal()
    }
}

impl<S> FromRequestParts<S> for Visitor
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::NoSession)?;

        let session_id = visitor_id(session).await;
        let customer_id = current_customer(session).await.map(|customer| customer.id);

        if let Some(customer_id) = &customer_id {
            Span::current().record("customer_id", customer_id.as_str());
        }

        Ok(Self(RequestContext {
            customer_id,
            session_id,
        }))
    }
}

/// The visitor id stored in the session, created on first use.
///
/// A failing session write is logged; the new id is still used for this
/// request.
pub async fn visitor_id(session: &Session) -> SessionId {
    match session.get::<SessionId>(session_keys::VISITOR_ID).await {
        Ok(Some(id)) => return id,
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Failed to read visitor id"),
    }

    let id = SessionId::new(Uuid::new_v4().to_string());
    if let Err(e) = session.insert(session_keys::VISITOR_ID, &id).await {
        warn!(error = %e, "Failed to store visitor id");
    } else {
        debug!(visitor_id = %id, "New visitor");
    }
    id
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_visitor_id_is_stable_within_session() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let first = visitor_id(&session).await;
        let second = visitor_id(&session).await;
        assert_eq!(first, second);

        let other = Session::new(None, Arc::new(MemoryStore::default()), None);
        assert_ne!(visitor_id(&other).await, first);
    }
}
