//! Cart route handlers.
//!
//! The cart id lives in the session. Every mutation redirects back to the
//! cart page with a flash message (post/redirect/get).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::header::CACHE_CONTROL,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::{RequestLocale, Visitor};
use crate::routes::forms::{AddToCartForm, LineQuantityForm, RemoveLineForm};
use crate::routes::views::{CartView, ListOption, PageContext, list_options};
use crate::routes::{done, recover, reject_form};
use crate::services::{AddLineItem, ServiceError};
use crate::state::AppState;

const CART_PATH: &str = "/cart";

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub cart: CartView,
    /// Targets for "save to list".
    pub lists: Vec<ListOption>,
}

/// Mini-cart fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/mini.html")]
pub struct MiniCartTemplate {
    pub item_count: u32,
    pub total: Option<String>,
}

/// Display cart page.
///
/// A session cart that belongs to someone else (for example after signing
/// in or out) is forgotten and replaced by a fresh cart.
#[instrument(skip_all, fields(principal = %visitor.principal()))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    visitor: Visitor,
    RequestLocale(locale): RequestLocale,
    page: PageContext,
) -> Result<CartShowTemplate, AppError> {
    let carts = state.carts();
    let principal = visitor.principal();

    let cart = match carts.current_cart(&session, &locale, &principal).await {
        Err(ServiceError::Forbidden(_)) => {
            carts.forget_cart(&session).await?;
            carts.current_cart(&session, &locale, &principal).await?
        }
        result => result?,
    };
    let lists = state.shopping_lists().name_index(&principal).await?;

    Ok(CartShowTemplate {
        page,
        cart: CartView::from(&cart),
        lists: list_options(lists),
    })
}

/// Mini-cart fragment: item count and total. Never creates a cart.
#[instrument(skip_all)]
pub async fn mini(
    State(state): State<AppState>,
    session: Session,
    visitor: Visitor,
) -> Result<Response, AppError> {
    let cart = state
        .carts()
        .peek_cart(&session, &visitor.principal())
        .await?;

    let template = MiniCartTemplate {
        item_count: cart.as_ref().map_or(0, |c| c.total_quantity()),
        total: cart
            .as_ref()
            .filter(|c| !c.is_empty())
            .map(|c| c.total_price().to_string()),
    };

    Ok(([(CACHE_CONTROL, "no-cache, no-store")], template).into_response())
}

/// Add a product variant to the cart, priced in the cart's own market.
#[instrument(skip_all, fields(principal = %visitor.principal()))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    visitor: Visitor,
    RequestLocale(locale): RequestLocale,
    Form(form): Form<AddToCartForm>,
) -> Result<Response, AppError> {
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return reject_form(&session, errors, CART_PATH).await,
    };

    let carts = state.carts();
    let principal = visitor.principal();
    let cart = match carts.current_cart(&session, &locale, &principal).await {
        Ok(cart) => cart,
        Err(err) => return recover(&session, err, CART_PATH).await,
    };
    let (currency, country) = carts.market_of(&cart, &locale);
    let request = AddLineItem {
        product_id: input.product_id,
        variant_id: input.variant_id,
        quantity: input.quantity,
        currency,
        country,
    };

    match carts
        .add_line_item(&session, &locale, &principal, &request)
        .await
    {
        Ok(_) => Ok(done(&session, "Added to your cart.", CART_PATH).await),
        Err(err) => recover(&session, err, CART_PATH).await,
    }
}

/// Change a line quantity; zero removes the line.
#[instrument(skip_all, fields(principal = %visitor.principal()))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    visitor: Visitor,
    Form(form): Form<LineQuantityForm>,
) -> Result<Response, AppError> {
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return reject_form(&session, errors, CART_PATH).await,
    };

    match state
        .carts()
        .change_line_item_quantity(
            &session,
            &visitor.principal(),
            &input.line_item_id,
            input.quantity,
        )
        .await
    {
        Ok(_) if input.quantity == 0 => {
            Ok(done(&session, "Removed from your cart.", CART_PATH).await)
        }
        Ok(_) => Ok(done(&session, "Cart updated.", CART_PATH).await),
        Err(err) => recover(&session, err, CART_PATH).await,
    }
}

/// Remove a line.
#[instrument(skip_all, fields(principal = %visitor.principal()))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    visitor: Visitor,
    Form(form): Form<RemoveLineForm>,
) -> Result<Response, AppError> {
    let line_item_id = match form.validate() {
        Ok(id) => id,
        Err(errors) => return reject_form(&session, errors, CART_PATH).await,
    };

    match state
        .carts()
        .delete_line_item(&session, &visitor.principal(), &line_item_id)
        .await
    {
        Ok(_) => Ok(done(&session, "Removed from your cart.", CART_PATH).await),
        Err(err) => recover(&session, err, CART_PATH).await,
    }
}
