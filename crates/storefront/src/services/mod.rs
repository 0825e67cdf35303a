//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `identity` - Who is acting (anonymous visitor or signed-in customer)
//! - `cart` - Session-scoped cart resolution and line item changes
//! - `shopping_list` - Named lists owned by a visitor or customer
//! - `customer` - Sign-in, account details and address book
//! - `order` - Order history
//!
//! Services own the ownership checks and the retry-on-conflict policy; the
//! commerce backend only knows ids and versions.

pub mod cart;
pub mod customer;
mod error;
pub mod identity;
pub mod order;
pub mod shopping_list;

pub use cart::{AddLineItem, CartManager};
pub use customer::{CustomerDetails, CustomerManager};
pub use error::{FieldError, ServiceError, ValidationErrors};
pub use identity::RequestContext;
pub use order::OrderManager;
pub use shopping_list::ShoppingListManager;

use std::future::Future;

use crate::backend::MAX_QUANTITY;

/// Reject a line quantity above [`MAX_QUANTITY`].
pub(crate) fn ensure_quantity_limit(quantity: u32) -> Result<(), ServiceError> {
    if quantity > MAX_QUANTITY {
        return Err(ServiceError::invalid(
            "quantity",
            format!("must be at most {MAX_QUANTITY}"),
        ));
    }
    Ok(())
}

/// Run `operation`, and run it once more if it failed with a version conflict.
///
/// Every attempt must re-read the entity so the second attempt is based on
/// the latest version. A second conflict is returned to the caller.
pub(crate) async fn retry_once_on_conflict<T, F, Fut>(mut operation: F) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    match operation().await {
        Err(err) if err.is_conflict() => {
            tracing::debug!(error = %err, "Version conflict, retrying once");
            operation().await
        }
        result => result,
    }
}
