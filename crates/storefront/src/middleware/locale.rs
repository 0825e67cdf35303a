//! Request locale negotiation from the `Accept-Language` header.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::ACCEPT_LANGUAGE, request::Parts},
};

use basket_core::Locale;

use crate::state::AppState;

/// The locale the request is served in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLocale(pub Locale);

impl<S> FromRequestParts<S> for RequestLocale
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let header = parts
            .headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok());

        Ok(Self(negotiate(header, &state.config().default_locale)))
    }
}

/// Pick the highest-weighted parseable tag of an `Accept-Language` value.
///
/// Ties keep header order. Falls back to `default` when nothing parses.
#[must_use]
pub fn negotiate(accept_language: Option<&str>, default: &Locale) -> Locale {
    let Some(header) = accept_language else {
        return default.clone();
    };

    let mut best: Option<(f32, Locale)> = None;
    for entry in header.split(',') {
        let mut params = entry.split(';');
        let tag = params.next().unwrap_or_default().trim();
        if tag == "*" {
            continue;
        }
        let weight = params
            .find_map(|param| param.trim().strip_prefix("q="))
            .and_then(|q| q.trim().parse::<f32>().ok())
            .unwrap_or(1.0);
        if weight <= 0.0 {
            continue;
        }
        let Ok(locale) = Locale::parse(tag) else {
            continue;
        };
        if best.as_ref().is_none_or(|(w, _)| weight > *w) {
            best = Some((weight, locale));
        }
    }

    best.map_or_else(|| default.clone(), |(_, locale)| locale)
}
