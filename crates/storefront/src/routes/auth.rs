//! Authentication route handlers.
//!
//! Credentials are verified by the commerce platform. On success the
//! customer is stored in the session; the anonymous session cart is left
//! behind (carts are not merged on sign-in).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, clear_current_customer, set_current_customer};
use crate::models::CurrentCustomer;
use crate::routes::done;
use crate::routes::forms::LoginForm;
use crate::routes::views::PageContext;
use crate::services::{ServiceError, ValidationErrors};
use crate::state::AppState;

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub email: String,
    pub errors: ValidationErrors,
}

/// Display the login page.
pub async fn login_page(OptionalAuth(customer): OptionalAuth, page: PageContext) -> Response {
    if customer.is_some() {
        return Redirect::to("/account").into_response();
    }

    LoginTemplate {
        page,
        email: String::new(),
        errors: ValidationErrors::new(),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let rerender = |errors: ValidationErrors| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            LoginTemplate {
                page: PageContext::default(),
                email: form.email.trim().to_string(),
                errors,
            },
        )
            .into_response()
    };

    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return Ok(rerender(errors)),
    };

    let customer = match state
        .customers()
        .sign_in(&input.email, &input.password)
        .await
    {
        Ok(customer) => customer,
        Err(ServiceError::Validation(errors)) => return Ok(rerender(errors)),
        Err(err) => return Err(err.into()),
    };

    set_current_customer(
        &session,
        &CurrentCustomer {
            id: customer.id.clone(),
            email: customer.email.clone(),
        },
    )
    .await?;
    state.carts().forget_cart(&session).await?;
    set_sentry_user(&customer.id);

    Ok(done(
        &session,
        format!("Welcome back, {}.", customer.display_name()),
        "/account",
    )
    .await)
}

/// Handle logout.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Response, AppError> {
    clear_current_customer(&session).await?;
    state.carts().forget_cart(&session).await?;
    clear_sentry_user();

    Ok(done(&session, "You have been signed out.", "/cart").await)
}
