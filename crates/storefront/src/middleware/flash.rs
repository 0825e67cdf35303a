//! One-shot flash messages carried across a redirect in the session.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;
use tracing::warn;

use crate::models::{FlashMessage, session_keys};

/// Queue a message for the next rendered page.
///
/// Flash messages are best effort: a failing session write is logged and
/// the message dropped.
pub async fn push_flash(session: &Session, message: FlashMessage) {
    let mut messages = match session
        .get::<Vec<FlashMessage>>(session_keys::FLASH)
        .await
    {
        Ok(messages) => messages.unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "Failed to read flash messages");
            Vec::new()
        }
    };
    messages.push(message);

    if let Err(e) = session.insert(session_keys::FLASH, messages).await {
        warn!(error = %e, "Failed to store flash message");
    }
}

/// Remove and return all queued messages.
pub async fn take_flashes(session: &Session) -> Vec<FlashMessage> {
    session
        .remove::<Vec<FlashMessage>>(session_keys::FLASH)
        .await
        .inspect_err(|e| warn!(error = %e, "Failed to take flash messages"))
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Extractor that consumes the queued flash messages.
pub struct Flashes(pub Vec<FlashMessage>);

impl<S> FromRequestParts<S> for Flashes
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let messages = match parts.extensions.get::<Session>() {
            Some(session) => take_flashes(session).await,
            None => Vec::new(),
        };
        Ok(Self(messages))
    }
}
