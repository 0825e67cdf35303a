//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (CSP, frame options, cache policy)
//! 5. Session layer (tower-sessions, `PostgreSQL` or memory store)
//! 6. Rate limiting on the sign-in form (governor)
//!
//! Identity, locale and flash messages are extractors rather than layers so
//! handlers only pay for what they use.

pub mod auth;
pub mod flash;
pub mod identity;
pub mod locale;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, clear_current_customer, set_current_customer};
pub use flash::{Flashes, push_flash};
pub use identity::Visitor;
pub use locale::RequestLocale;
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
