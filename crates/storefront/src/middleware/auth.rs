//! Authentication extractors.
//!
//! The signed-in customer is a [`CurrentCustomer`] entry in the session,
//! written on sign-in and removed on sign-out.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentCustomer, session_keys};

/// Extractor that requires a signed-in customer.
///
/// If no customer is signed in, redirects to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(customer): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", customer.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentCustomer);

/// Error returned when a signed-in customer is required.
pub enum AuthRejection {
    /// Redirect to login page.
    RedirectToLogin,
    /// The session layer is missing from the router.
    NoSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::NoSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::NoSession)?;

        let customer = current_customer(session)
            .await
            .ok_or(AuthRejection::RedirectToLogin)?;

        Ok(Self(customer))
    }
}

/// Extractor that optionally gets the current customer.
///
/// Unlike `RequireAuth`, this does not reject the request if no customer is
/// signed in.
pub struct OptionalAuth(pub Option<CurrentCustomer>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let customer = match parts.extensions.get::<Session>() {
            Some(session) => current_customer(session).await,
            None => None,
        };

        Ok(Self(customer))
    }
}

/// The signed-in customer, treating an unreadable entry as signed out.
pub async fn current_customer(session: &Session) -> Option<CurrentCustomer> {
    session
        .get::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Failed to read current customer"))
        .ok()
        .flatten()
}

/// Helper to set the current customer in the session.
///
/// Cycles the session id first so a pre-login session id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_customer(
    session: &Session,
    customer: &CurrentCustomer,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session
        .insert(session_keys::CURRENT_CUSTOMER, customer)
        .await
}

/// Helper to clear the current customer from the session (logout).
///
/// The visitor id survives, so anonymous carts and lists stay reachable.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_customer(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
        .await?;
    session.cycle_id().await?;
    Ok(())
}
