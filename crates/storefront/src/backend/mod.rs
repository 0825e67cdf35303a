//! Commerce platform backend clients.
//!
//! # Architecture
//!
//! - The platform is the source of truth - NO local sync, direct API calls
//! - [`CommerceBackend`] is the seam every service talks to
//! - [`HttpBackend`] speaks the platform's JSON REST API
//! - [`InMemoryBackend`] keeps everything in process, for local development
//!   and tests, with the same versioning and atomicity rules
//!
//! # Updates
//!
//! Versioned entities (carts, shopping lists, customers) are changed by
//! sending an [`UpdateRequest`]: the version the caller last observed plus a
//! list of actions. The backend applies all actions or none and answers with
//! the new state. A stale version fails with [`BackendError::Conflict`].
//!
//! ```rust,ignore
//! let update = UpdateRequest::new(cart.id.clone(), cart.version)
//!     .with(CartAction::RemoveLineItem { line_item_id })
//!     .with(CartAction::AddLineItem { product_id, variant_id, quantity: 2 });
//! let cart = backend.update_cart(update).await?;
//! ```

pub mod catalog;
mod http;
mod memory;
pub mod types;

pub use catalog::Catalog;
pub use http::HttpBackend;
pub use memory::InMemoryBackend;
pub use types::*;

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

use basket_core::{
    AddressId, CartId, CurrencyCode, CustomerId, Email, LineItemId, Locale, OrderId, Principal,
    ProductId, ShoppingListId, VariantId, Version,
};

use crate::config::BackendConfig;

/// Errors that can occur when talking to the commerce backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Referenced resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The entity was modified since the caller read it.
    #[error("{}", format_conflict(.expected, .actual.as_ref()))]
    Conflict {
        /// Version sent with the update.
        expected: Version,
        /// Current version, when the backend reports it.
        actual: Option<Version>,
    },

    /// The backend rejected the request payload.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Email/password combination not accepted.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with an unexpected status.
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the error body, truncated.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response parsed but does not describe a valid entity.
    #[error("Unexpected response: {0}")]
    Unexpected(String),
}

fn format_conflict(expected: &Version, actual: Option<&Version>) -> String {
    match actual {
        Some(actual) => {
            format!("Version conflict: expected version {expected}, current version is {actual}")
        }
        None => format!("Version conflict: version {expected} is stale"),
    }
}

// =============================================================================
// Update Actions
// =============================================================================

/// A single change to a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// Add units of a variant; merges into an existing line for the same variant.
    AddLineItem {
        product_id: ProductId,
        variant_id: VariantId,
        quantity: u32,
    },
    /// Set the quantity of an existing line.
    ChangeLineItemQuantity {
        line_item_id: LineItemId,
        quantity: u32,
    },
    /// Remove a line.
    RemoveLineItem { line_item_id: LineItemId },
}

/// A single change to a shopping list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShoppingListAction {
    /// Add units of a variant; merges into an existing line for the same variant.
    AddLineItem {
        product_id: ProductId,
        variant_id: VariantId,
        quantity: u32,
    },
    /// Set the quantity of an existing line.
    ChangeLineItemQuantity {
        line_item_id: LineItemId,
        quantity: u32,
    },
    /// Remove a line.
    RemoveLineItem { line_item_id: LineItemId },
    /// Rename the list.
    ChangeName { name: String },
}

/// A single change to a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerAction {
    SetFirstName(Option<String>),
    SetLastName(Option<String>),
    ChangeEmail(Email),
    /// Replace the address with the given id.
    ChangeAddress {
        address_id: AddressId,
        address: Address,
    },
}

/// Pending changes for one versioned entity, flushed in a single call.
///
/// The request is a plain value: actions are appended by value and the
/// whole request is moved into the backend's `update_*` method, so it can
/// neither be shared between entities nor reused after it was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "an update request does nothing until it is sent to the backend"]
pub struct UpdateRequest<Id, A> {
    id: Id,
    version: Version,
    actions: Vec<A>,
}

impl<Id, A> UpdateRequest<Id, A> {
    /// Start an update for the entity `id` at the version last observed.
    pub const fn new(id: Id, version: Version) -> Self {
        Self {
            id,
            version,
            actions: Vec::new(),
        }
    }

    /// Queue another action.
    pub fn with(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Queue several actions.
    pub fn with_all(mut self, actions: impl IntoIterator<Item = A>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Target entity id.
    #[must_use]
    pub const fn id(&self) -> &Id {
        &self.id
    }

    /// Version the update is based on.
    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    /// Queued actions, in order.
    #[must_use]
    pub fn actions(&self) -> &[A] {
        &self.actions
    }

    /// Whether no action has been queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Split into id, version and actions.
    #[must_use]
    pub fn into_parts(self) -> (Id, Version, Vec<A>) {
        (self.id, self.version, self.actions)
    }
}

/// Update request for a cart.
pub type CartUpdate = UpdateRequest<CartId, CartAction>;
/// Update request for a shopping list.
pub type ShoppingListUpdate = UpdateRequest<ShoppingListId, ShoppingListAction>;
/// Update request for a customer.
pub type CustomerUpdate = UpdateRequest<CustomerId, CustomerAction>;

// =============================================================================
// Backend Trait
// =============================================================================

/// Operations the storefront needs from the commerce platform.
///
/// `get_*` methods return `Ok(None)` for missing resources; update methods
/// return [`BackendError::NotFound`] when the target is gone.
#[async_trait]
pub trait CommerceBackend: Send + Sync {
    /// Fetch a cart by id.
    async fn get_cart(&self, id: &CartId) -> Result<Option<Cart>, BackendError>;

    /// Create an empty cart.
    async fn create_cart(&self, draft: CartDraft) -> Result<Cart, BackendError>;

    /// Apply all actions of `update` to a cart atomically.
    async fn update_cart(&self, update: CartUpdate) -> Result<Cart, BackendError>;

    /// Look up a variant priced for the given currency and country.
    async fn find_variant(
        &self,
        product_id: &ProductId,
        variant_id: VariantId,
        currency: CurrencyCode,
        country: &str,
    ) -> Result<Option<ProductVariant>, BackendError>;

    /// All shopping lists owned by `owner`, oldest first.
    async fn query_shopping_lists(&self, owner: &Principal)
    -> Result<Vec<ShoppingList>, BackendError>;

    /// Fetch a shopping list by id.
    async fn get_shopping_list(
        &self,
        id: &ShoppingListId,
    ) -> Result<Option<ShoppingList>, BackendError>;

    /// Create an empty shopping list.
    async fn create_shopping_list(
        &self,
        draft: ShoppingListDraft,
    ) -> Result<ShoppingList, BackendError>;

    /// Apply all actions of `update` to a shopping list atomically.
    async fn update_shopping_list(
        &self,
        update: ShoppingListUpdate,
    ) -> Result<ShoppingList, BackendError>;

    /// Delete a shopping list at the given version.
    async fn delete_shopping_list(
        &self,
        id: &ShoppingListId,
        version: Version,
    ) -> Result<(), BackendError>;

    /// Verify credentials and return the customer.
    async fn sign_in(&self, email: &Email, password: &SecretString)
    -> Result<Customer, BackendError>;

    /// Fetch a customer by id.
    async fn get_customer(&self, id: &CustomerId) -> Result<Option<Customer>, BackendError>;

    /// Apply all actions of `update` to a customer atomically.
    async fn update_customer(&self, update: CustomerUpdate) -> Result<Customer, BackendError>;

    /// Orders placed by a customer, newest first.
    async fn query_orders(&self, customer_id: &CustomerId) -> Result<Vec<Order>, BackendError>;

    /// Fetch an order by id.
    async fn get_order(&self, id: &OrderId) -> Result<Option<Order>, BackendError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), BackendError>;
}

// =============================================================================
// Construction
// =============================================================================

/// Errors building a backend from configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Catalog(#[from] catalog::CatalogError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Build the backend selected by `config`.
///
/// # Errors
///
/// Returns [`SetupError`] if the catalog file cannot be loaded or the HTTP
/// client cannot be created.
pub fn from_config(
    config: &BackendConfig,
    default_locale: &Locale,
) -> Result<Arc<dyn CommerceBackend>, SetupError> {
    match config {
        BackendConfig::Memory { catalog_file } => {
            let catalog = match catalog_file {
                Some(path) => Catalog::load(path)?,
                None => Catalog::demo(),
            };
            tracing::info!(
                variants = catalog.variant_count(),
                "Using in-memory commerce backend"
            );
            Ok(Arc::new(InMemoryBackend::new(catalog)))
        }
        BackendConfig::Http(api) => {
            tracing::info!(
                api_url = %api.api_url,
                project = %api.project_key,
                "Using commerce platform API"
            );
            Ok(Arc::new(HttpBackend::new(api, default_locale)?))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_accumulates_in_order() {
        let update = ShoppingListUpdate::new(ShoppingListId::new("l1"), Version::new(4))
            .with(ShoppingListAction::ChangeName {
                name: "Gifts".to_string(),
            })
            .with(ShoppingListAction::RemoveLineItem {
                line_item_id: LineItemId::new("x"),
            });

        assert_eq!(update.version(), Version::new(4));
        assert_eq!(update.actions().len(), 2);
        assert!(matches!(
            update.actions().first(),
            Some(ShoppingListAction::ChangeName { .. })
        ));

        let (id, version, actions) = update.into_parts();
        assert_eq!(id.as_str(), "l1");
        assert_eq!(version, Version::new(4));
        assert_eq!(actions.len(), 2);
    }

    #[test]
    fn test_conflict_display() {
        let err = BackendError::Conflict {
            expected: Version::new(2),
            actual: Some(Version::new(3)),
        };
        assert_eq!(
            err.to_string(),
            "Version conflict: expected version 2, current version is 3"
        );

        let err = BackendError::Conflict {
            expected: Version::new(2),
            actual: None,
        };
        assert_eq!(err.to_string(), "Version conflict: version 2 is stale");
    }

    #[test]
    fn test_from_config_memory_uses_demo_catalog() {
        let locale = Locale::parse("en-US").unwrap();
        let backend = from_config(&BackendConfig::Memory { catalog_file: None }, &locale);
        assert!(backend.is_ok());
    }

    #[test]
    fn test_from_config_missing_catalog_file() {
        let locale = Locale::parse("en-US").unwrap();
        let config = BackendConfig::Memory {
            catalog_file: Some("does/not/exist.yaml".into()),
        };
        assert!(matches!(
            from_config(&config, &locale),
            Err(SetupError::Catalog(_))
        ));
    }
}
