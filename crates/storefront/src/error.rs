//! Unified error handling with Sentry integration.
//!
//! Handlers return `Result<T, AppError>`. Recoverable service errors
//! (validation, missing entities, conflicts) are usually turned into a flash
//! message and a redirect before they get here, see
//! [`crate::routes::recover`]. Whatever reaches [`AppError`] is rendered as
//! an error page; server-side failures are captured to Sentry first.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::backend::BackendError;
use crate::routes::views::PageContext;
use crate::services::{ServiceError, ValidationErrors};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request input was rejected.
    #[error("Bad request: {0}")]
    BadRequest(ValidationErrors),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource belongs to someone else.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Concurrent modification that survived the retry.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Commerce backend failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(errors) => Self::BadRequest(errors),
            ServiceError::NotFound(what) => Self::NotFound(what),
            ServiceError::Forbidden(what) => Self::Forbidden(what),
            ServiceError::Conflict(what) => Self::Conflict(what),
            ServiceError::Backend(err) => Self::Backend(err),
            ServiceError::Session(err) => Self::Session(err),
        }
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Backend(_) => StatusCode::BAD_GATEWAY,
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the visitor.
    fn public_message(&self) -> String {
        match self {
            Self::BadRequest(errors) => errors.to_string(),
            Self::NotFound(_) => "The page you were looking for does not exist.".to_string(),
            Self::Forbidden(_) => "You do not have access to this page.".to_string(),
            Self::Conflict(_) => {
                "This was changed in the meantime. Please reload and try again.".to_string()
            }
            Self::Backend(_) => {
                "The shop is temporarily unavailable. Please try again shortly.".to_string()
            }
            Self::Session(_) => "Something went wrong on our side.".to_string(),
        }
    }
}

/// Error page template.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub page: PageContext,
    pub status: u16,
    pub title: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let template = ErrorTemplate {
            page: PageContext::default(),
            status: status.as_u16(),
            title: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            message: self.public_message(),
        };

        match template.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to render error page");
                (status, template.message).into_response()
            }
        }
    }
}

/// Set the Sentry user context after sign-in.
pub fn set_sentry_user(customer_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(customer_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the customer.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order o-1".to_string());
        assert_eq!(err.to_string(), "Not found: order o-1");
    }

    #[test]
    fn test_service_error_mapping() {
        let status = |err: ServiceError| AppError::from(err).into_response().status();

        assert_eq!(
            status(ServiceError::Forbidden("cart c1".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status(ServiceError::NotFound("order".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(ServiceError::invalid("quantity", "must be at least 1")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(ServiceError::Conflict("cart".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(ServiceError::Backend(BackendError::Api {
                status: 503,
                message: "down".to_string(),
            })),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status(ServiceError::Session(tower_sessions::session::Error::Store(
                tower_sessions::session_store::Error::Backend("down".to_string())
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_page_hides_internal_details() {
        let err = AppError::Backend(BackendError::Api {
            status: 500,
            message: "secret stack trace".to_string(),
        });
        assert!(!err.public_message().contains("secret"));
    }
}
