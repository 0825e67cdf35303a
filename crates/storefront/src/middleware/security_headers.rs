//! Response security headers.
//!
//! The storefront renders plain HTML forms and one same-origin stylesheet.
//! It ships no scripts, fonts or third-party assets, so the policy only
//! allows what those pages load.

use axum::{
    extract::Request,
    http::{
        HeaderMap, HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

/// Pages may load the stylesheet and same-origin images and post forms back
/// to the storefront. Nothing else.
const CONTENT_POLICY: &str = "default-src 'none'; style-src 'self'; img-src 'self'; \
     form-action 'self'; base-uri 'none'; frame-ancestors 'none'";

/// Browser features no storefront page uses.
const PERMISSIONS_POLICY: &str = "camera=(), geolocation=(), microphone=(), payment=(), usb=()";

/// Prefix of the static asset routes.
const STATIC_PREFIX: &str = "/static/";

/// Add security headers to every response.
///
/// Carts, lists and accounts are per visitor, so dynamic responses are not
/// stored by caches unless the handler chose its own `Cache-Control`.
/// Static assets keep the server's default caching.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let is_static = request.uri().path().starts_with(STATIC_PREFIX);
    let mut response = next.run(request).await;
    apply_security_headers(response.headers_mut(), is_static);
    response
}

fn apply_security_headers(headers: &mut HeaderMap, is_static: bool) {
    let fixed = [
        (CONTENT_SECURITY_POLICY, CONTENT_POLICY),
        (X_FRAME_OPTIONS, "DENY"),
        (X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (REFERRER_POLICY, "same-origin"),
    ];
    for (name, value) in fixed {
        headers.insert(name, HeaderValue::from_static(value));
    }
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(PERMISSIONS_POLICY),
    );

    if !is_static {
        headers
            .entry(CACHE_CONTROL)
            .or_insert(HeaderValue::from_static("private, no-store"));
    }
}
