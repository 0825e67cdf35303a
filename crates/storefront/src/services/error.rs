//! Service error taxonomy.
//!
//! Services classify every [`BackendError`] into one of these kinds so route
//! handlers can decide between re-rendering a form, flashing a message or
//! failing the request without looking at backend payloads.

use std::fmt;

use thiserror::Error;

use crate::backend::BackendError;

/// Errors returned by the storefront services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// User input was rejected.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// The referenced entity does not exist (or is not visible to the caller).
    #[error("{0} not found")]
    NotFound(String),

    /// The entity changed concurrently and the retry did not help.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The entity belongs to another principal.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Transport failure or unexpected backend answer.
    #[error("backend error: {0}")]
    Backend(BackendError),

    /// The session store failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl ServiceError {
    /// Validation error for a single field.
    #[must_use]
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation(ValidationErrors::single(field, message))
    }

    /// Whether a retry with fresh state might succeed.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<BackendError> for ServiceError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound(what) => Self::NotFound(what),
            BackendError::Conflict { .. } => Self::Conflict(err.to_string()),
            BackendError::InvalidInput(message) => Self::invalid("form", message),
            BackendError::InvalidCredentials => {
                Self::invalid("email", "Email or password is incorrect")
            }
            other => Self::Backend(other),
        }
    }
}

/// A rejected form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Form field name.
    pub field: &'static str,
    /// Human-readable message.
    pub message: String,
}

/// Field errors collected while validating a form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    #[must_use]
    pub const fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// A single field error.
    #[must_use]
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// First message for `field`.
    #[must_use]
    pub fn for_field(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// All errors in the order they were added.
    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.errors.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.errors {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
            first = false;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

#[cfg(test)]
mod tests {
    use basket_core::Version;

    use super::*;

    #[test]
    fn test_backend_error_classification() {
        assert!(matches!(
            ServiceError::from(BackendError::NotFound("cart c1".into())),
            ServiceError::NotFound(what) if what == "cart c1"
        ));
        assert!(
            ServiceError::from(BackendError::Conflict {
                expected: Version::new(1),
                actual: None,
            })
            .is_conflict()
        );
        assert!(matches!(
            ServiceError::from(BackendError::InvalidCredentials),
            ServiceError::Validation(errors) if errors.for_field("email").is_some()
        ));
        assert!(matches!(
            ServiceError::from(BackendError::Api {
                status: 500,
                message: String::new(),
            }),
            ServiceError::Backend(_)
        ));
    }

    #[test]
    fn test_validation_errors_display() {
        let mut errors = ValidationErrors::new();
        errors.add("quantity", "must be at least 1");
        errors.add("variant_id", "must be a positive integer");
        assert_eq!(
            errors.to_string(),
            "quantity: must be at least 1; variant_id: must be a positive integer"
        );
        assert_eq!(errors.for_field("quantity"), Some("must be at least 1"));
        assert_eq!(errors.for_field("email"), None);
    }
}
