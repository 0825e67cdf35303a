//! Account route handlers.
//!
//! These routes require authentication. Account data is read from the
//! commerce platform on every request; the session only holds the customer
//! id and email.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use basket_core::{AddressId, OrderId};

use crate::backend::Customer;
use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::models::{CurrentCustomer, session_keys};
use crate::routes::forms::{AccountForm, AddressForm};
use crate::routes::views::{AddressView, CustomerView, OrderView, PageContext};
use crate::routes::{done, recover};
use crate::services::{ServiceError, ValidationErrors};
use crate::state::AppState;

const ACCOUNT_PATH: &str = "/account";
const ADDRESSES_PATH: &str = "/account/addresses";
const ORDERS_PATH: &str = "/account/orders";

/// Account details page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/details.html")]
pub struct AccountTemplate {
    pub page: PageContext,
    pub customer: CustomerView,
    pub form: AccountForm,
    pub errors: ValidationErrors,
}

/// Address book template.
#[derive(Template, WebTemplate)]
#[template(path = "account/addresses.html")]
pub struct AddressesTemplate {
    pub page: PageContext,
    pub addresses: Vec<AddressView>,
}

/// Edit address form template.
#[derive(Template, WebTemplate)]
#[template(path = "account/edit_address.html")]
pub struct EditAddressTemplate {
    pub page: PageContext,
    pub address_id: String,
    pub form: AddressForm,
    pub errors: ValidationErrors,
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub page: PageContext,
    pub orders: Vec<OrderView>,
}

/// Order detail template.
#[derive(Template, WebTemplate)]
#[template(path = "account/order.html")]
pub struct OrderTemplate {
    pub page: PageContext,
    pub order: OrderView,
}

/// Layout data for a form that is re-rendered in the same request.
fn form_page(current: &CurrentCustomer) -> PageContext {
    PageContext {
        customer_email: Some(current.email.to_string()),
        flashes: Vec::new(),
    }
}

/// Display account details.
#[instrument(skip_all, fields(customer_id = %current.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    page: PageContext,
) -> Result<AccountTemplate, AppError> {
    let customer = state.customers().get_by_id(&current.id).await?;

    Ok(AccountTemplate {
        page,
        form: AccountForm {
            first_name: customer.first_name.clone().unwrap_or_default(),
            last_name: customer.last_name.clone().unwrap_or_default(),
            email: customer.email.to_string(),
        },
        customer: CustomerView::from(&customer),
        errors: ValidationErrors::new(),
    })
}

/// Update name and email.
#[instrument(skip_all, fields(customer_id = %current.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Form(form): Form<AccountForm>,
) -> Result<Response, AppError> {
    let details = match form.validate() {
        Ok(details) => details,
        Err(errors) => {
            let customer = state.customers().get_by_id(&current.id).await?;
            return Ok(rerender_account(&current, &customer, form, errors));
        }
    };

    match state.customers().update_details(&current.id, details).await {
        Ok(customer) => {
            session
                .insert(
                    session_keys::CURRENT_CUSTOMER,
                    &CurrentCustomer {
                        id: customer.id,
                        email: customer.email,
                    },
                )
                .await?;
            Ok(done(&session, "Your details were saved.", ACCOUNT_PATH).await)
        }
        Err(ServiceError::Validation(errors)) => {
            let customer = state.customers().get_by_id(&current.id).await?;
            Ok(rerender_account(&current, &customer, form, errors))
        }
        Err(err) => recover(&session, err, ACCOUNT_PATH).await,
    }
}

fn rerender_account(
    current: &CurrentCustomer,
    customer: &Customer,
    form: AccountForm,
    errors: ValidationErrors,
) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        AccountTemplate {
            page: form_page(current),
            customer: CustomerView::from(customer),
            form,
            errors,
        },
    )
        .into_response()
}

/// Display the address book.
#[instrument(skip_all, fields(customer_id = %current.id))]
pub async fn addresses(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    page: PageContext,
) -> Result<AddressesTemplate, AppError> {
    let customer = state.customers().get_by_id(&current.id).await?;

    Ok(AddressesTemplate {
        page,
        addresses: customer.addresses.iter().map(AddressView::from).collect(),
    })
}

/// Display the edit form for one address.
#[instrument(skip_all, fields(customer_id = %current.id, %id))]
pub async fn edit_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    page: PageContext,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let customer = state.customers().get_by_id(&current.id).await?;
    let address_id = AddressId::new(id);

    let Some(address) = customer.address(&address_id) else {
        let err = ServiceError::NotFound(format!("address {address_id}"));
        return recover(&session, err, ADDRESSES_PATH).await;
    };

    Ok(EditAddressTemplate {
        page,
        address_id: address_id.to_string(),
        form: AddressForm::from_address(address),
        errors: ValidationErrors::new(),
    }
    .into_response())
}

/// Replace one address.
#[instrument(skip_all, fields(customer_id = %current.id, %id))]
pub async fn update_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<AddressForm>,
) -> Result<Response, AppError> {
    let address_id = AddressId::new(id);
    let rerender = |form: AddressForm, errors: ValidationErrors| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            EditAddressTemplate {
                page: form_page(&current),
                address_id: address_id.to_string(),
                form,
                errors,
            },
        )
            .into_response()
    };

    let address = match form.validate(&address_id) {
        Ok(address) => address,
        Err(errors) => return Ok(rerender(form, errors)),
    };

    match state
        .customers()
        .change_address(&current.id, &address_id, address)
        .await
    {
        Ok(_) => Ok(done(&session, "Address saved.", ADDRESSES_PATH).await),
        Err(ServiceError::Validation(errors)) => Ok(rerender(form, errors)),
        Err(err) => recover(&session, err, ADDRESSES_PATH).await,
    }
}

/// Display the order history, newest first.
#[instrument(skip_all, fields(customer_id = %current.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    page: PageContext,
) -> Result<OrdersTemplate, AppError> {
    let orders = state.orders().get_orders(&current.id).await?;

    Ok(OrdersTemplate {
        page,
        orders: orders.iter().map(OrderView::from).collect(),
    })
}

/// Display one order. Orders of other customers are a 403.
#[instrument(skip_all, fields(customer_id = %current.id, %id))]
pub async fn order(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    page: PageContext,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let order_id = OrderId::new(id);

    match state.orders().get_order(&order_id, &current.id).await {
        Ok(order) => Ok(OrderTemplate {
            page,
            order: OrderView::from(&order),
        }
        .into_response()),
        Err(err) => recover(&session, err, ORDERS_PATH).await,
    }
}
