//! Shopping list route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::Response,
};
use tower_sessions::Session;
use tracing::instrument;

use basket_core::ShoppingListId;

use crate::error::AppError;
use crate::middleware::{RequestLocale, Visitor};
use crate::routes::forms::{
    ListNameForm, ShoppingListLineForm, ShoppingListQuantityForm, ShoppingListRemoveForm,
};
use crate::routes::views::{PageContext, ShoppingListView};
use crate::routes::{done, recover, reject_form};
use crate::state::AppState;

const LISTS_PATH: &str = "/shopping-lists";

/// Shopping lists page template.
#[derive(Template, WebTemplate)]
#[template(path = "shopping_lists/index.html")]
pub struct ShoppingListsTemplate {
    pub page: PageContext,
    pub lists: Vec<ShoppingListView>,
}

/// Display all lists of the visitor, oldest first.
#[instrument(skip_all, fields(principal = %visitor.principal()))]
pub async fn index(
    State(state): State<AppState>,
    visitor: Visitor,
    page: PageContext,
) -> Result<ShoppingListsTemplate, AppError> {
    let lists = state
        .shopping_lists()
        .get_all_owned_by(&visitor.principal())
        .await?;

    Ok(ShoppingListsTemplate {
        page,
        lists: lists.iter().map(ShoppingListView::from).collect(),
    })
}

/// Create a list.
#[instrument(skip_all, fields(principal = %visitor.principal()))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    visitor: Visitor,
    RequestLocale(locale): RequestLocale,
    Form(form): Form<ListNameForm>,
) -> Result<Response, AppError> {
    match state
        .shopping_lists()
        .create(&locale, &form.name, &visitor.principal())
        .await
    {
        Ok(list) => Ok(done(&session, format!("Created list \"{}\".", list.name), LISTS_PATH).await),
        Err(err) => recover(&session, err, LISTS_PATH).await,
    }
}

/// Delete a list. Someone else's list is a 403.
#[instrument(skip_all, fields(principal = %visitor.principal(), %id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    visitor: Visitor,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let list_id = ShoppingListId::new(id);
    match state
        .shopping_lists()
        .delete(&list_id, &visitor.principal())
        .await
    {
        Ok(()) => Ok(done(&session, "List deleted.", LISTS_PATH).await),
        Err(err) => recover(&session, err, LISTS_PATH).await,
    }
}

/// Rename a list.
#[instrument(skip_all, fields(principal = %visitor.principal(), %id))]
pub async fn rename(
    State(state): State<AppState>,
    session: Session,
    visitor: Visitor,
    Path(id): Path<String>,
    Form(form): Form<ListNameForm>,
) -> Result<Response, AppError> {
    let list_id = ShoppingListId::new(id);
    match state
        .shopping_lists()
        .rename(&list_id, &visitor.principal(), &form.name)
        .await
    {
        Ok(list) => Ok(done(&session, format!("Renamed to \"{}\".", list.name), LISTS_PATH).await),
        Err(err) => recover(&session, err, LISTS_PATH).await,
    }
}

/// Add a product variant to a list. Quantity defaults to 1.
#[instrument(skip_all, fields(principal = %visitor.principal()))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    visitor: Visitor,
    Form(form): Form<ShoppingListLineForm>,
) -> Result<Response, AppError> {
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return reject_form(&session, errors, LISTS_PATH).await,
    };

    match state
        .shopping_lists()
        .add_line_item(
            &input.list_id,
            &visitor.principal(),
            &input.product_id,
            input.variant_id,
            input.quantity,
        )
        .await
    {
        Ok(list) => Ok(done(&session, format!("Saved to \"{}\".", list.name), LISTS_PATH).await),
        Err(err) => recover(&session, err, LISTS_PATH).await,
    }
}

/// Change a line quantity; zero removes the line.
#[instrument(skip_all, fields(principal = %visitor.principal()))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    visitor: Visitor,
    Form(form): Form<ShoppingListQuantityForm>,
) -> Result<Response, AppError> {
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return reject_form(&session, errors, LISTS_PATH).await,
    };

    match state
        .shopping_lists()
        .change_line_item_quantity(
            &input.list_id,
            &visitor.principal(),
            &input.line_item_id,
            input.quantity,
        )
        .await
    {
        Ok(_) => Ok(done(&session, "List updated.", LISTS_PATH).await),
        Err(err) => recover(&session, err, LISTS_PATH).await,
    }
}

/// Remove a line.
#[instrument(skip_all, fields(principal = %visitor.principal()))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    visitor: Visitor,
    Form(form): Form<ShoppingListRemoveForm>,
) -> Result<Response, AppError> {
    let (list_id, line_item_id) = match form.validate() {
        Ok(ids) => ids,
        Err(errors) => return reject_form(&session, errors, LISTS_PATH).await,
    };

    match state
        .shopping_lists()
        .remove_line_item(&list_id, &visitor.principal(), &line_item_id)
        .await
    {
        Ok(_) => Ok(done(&session, "Removed from the list.", LISTS_PATH).await),
        Err(err) => recover(&session, err, LISTS_PATH).await,
    }
}
