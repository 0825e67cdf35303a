//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - Redirect to the cart
//! GET  /health                        - Liveness
//! GET  /health/ready                  - Readiness (backend, session database)
//!
//! # Cart
//! GET  /cart                          - Cart page
//! GET  /cart/mini                     - Mini-cart fragment (never cached)
//! POST /cart/add                      - Add a product variant
//! POST /cart/update                   - Change a line quantity (0 removes)
//! POST /cart/remove                   - Remove a line
//!
//! # Shopping Lists
//! GET  /shopping-lists                - All lists of the visitor
//! POST /shopping-lists                - Create a list
//! POST /shopping-lists/{id}/delete    - Delete a list
//! POST /shopping-lists/{id}/rename    - Rename a list
//! POST /shopping-lists/add            - Add a product variant to a list
//! POST /shopping-lists/update         - Change a line quantity (0 removes)
//! POST /shopping-lists/remove         - Remove a line
//!
//! # Auth
//! GET  /auth/login                    - Login page
//! POST /auth/login                    - Login action (rate limited)
//! POST /auth/logout                   - Logout action
//!
//! # Account (requires auth)
//! GET  /account                       - Account details
//! POST /account                       - Update account details
//! GET  /account/addresses             - Address book
//! GET  /account/addresses/{id}/edit   - Edit address form
//! POST /account/addresses/{id}/edit   - Update address
//! GET  /account/orders                - Order history
//! GET  /account/orders/{id}           - Order detail
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod forms;
pub mod health;
pub mod shopping_lists;
pub mod views;

use axum::{
    Router,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_sessions::Session;

use crate::error::AppError;
use crate::middleware::{auth_rate_limiter, push_flash};
use crate::models::FlashMessage;
use crate::services::{ServiceError, ValidationErrors};
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/mini", get(cart::mini))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
}

/// Create the shopping list routes router.
pub fn shopping_list_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(shopping_lists::index).post(shopping_lists::create))
        .route("/{id}/delete", post(shopping_lists::delete))
        .route("/{id}/rename", post(shopping_lists::rename))
        .route("/add", post(shopping_lists::add))
        .route("/update", post(shopping_lists::update))
        .route("/remove", post(shopping_lists::remove))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            get(auth::login_page).merge(post(auth::login).layer(auth_rate_limiter())),
        )
        .route("/logout", post(auth::logout))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index).post(account::update))
        .route("/addresses", get(account::addresses))
        .route(
            "/addresses/{id}/edit",
            get(account::edit_address).post(account::update_address),
        )
        .route("/orders", get(account::orders))
        .route("/orders/{id}", get(account::order))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/cart") }))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/cart", cart_routes())
        .nest("/shopping-lists", shopping_list_routes())
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
}

// =============================================================================
// Error Recovery
// =============================================================================

/// Turn a recoverable service error into a flash message and a redirect to
/// `back_to`.
///
/// Validation errors, missing entities and conflicts are recoverable.
/// Anything else becomes an error page.
///
/// # Errors
///
/// Returns the error as an [`AppError`] if it is not recoverable.
pub async fn recover(
    session: &Session,
    err: ServiceError,
    back_to: &str,
) -> Result<Response, AppError> {
    let message = match &err {
        ServiceError::Validation(errors) => errors.to_string(),
        ServiceError::NotFound(_) => "That item no longer exists.".to_string(),
        ServiceError::Conflict(_) => {
            "This was changed in the meantime, please try again.".to_string()
        }
        ServiceError::Forbidden(_) | ServiceError::Backend(_) | ServiceError::Session(_) => {
            return Err(err.into());
        }
    };

    tracing::debug!(error = %err, back_to, "Recovering with flash message");
    push_flash(session, FlashMessage::error(message)).await;
    Ok(Redirect::to(back_to).into_response())
}

/// [`recover`] for form input that failed to convert.
///
/// # Errors
///
/// Never fails; the signature matches [`recover`] for use in handlers.
pub async fn reject_form(
    session: &Session,
    errors: ValidationErrors,
    back_to: &str,
) -> Result<Response, AppError> {
    recover(session, ServiceError::Validation(errors), back_to).await
}

/// Flash a success message and redirect.
pub async fn done(session: &Session, message: impl Into<String>, to: &str) -> Response {
    push_flash(session, FlashMessage::success(message)).await;
    Redirect::to(to).into_response()
}
