//! In-process commerce backend.
//!
//! Keeps carts, shopping lists, customers and orders in memory with the same
//! version and all-or-nothing rules as the remote platform. Used for local
//! development (`COMMERCE_BACKEND=memory`) and tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use basket_core::{
    AddressId, CartId, CurrencyCode, CustomerId, Email, LineItemId, OrderId, Principal, ProductId,
    ShoppingListId, VariantId, Version,
};

use super::{
    Address, BackendError, Cart, CartAction, CartDraft, CartUpdate, Catalog, CommerceBackend, Customer,
    CustomerAction, CustomerUpdate, LineItem, MAX_QUANTITY, Order, ProductVariant, ShoppingList,
    ShoppingListAction, ShoppingListDraft, ShoppingListUpdate,
};

/// In-memory [`CommerceBackend`].
///
/// Cloning is cheap and clones share state.
#[derive(Clone)]
pub struct InMemoryBackend {
    inner: Arc<InMemoryBackendInner>,
}

struct InMemoryBackendInner {
    catalog: Catalog,
    store: RwLock<Store>,
    interleaved_writes: AtomicUsize,
}

#[derive(Default)]
struct Store {
    carts: HashMap<CartId, Cart>,
    // Vec keeps creation order for listing.
    shopping_lists: Vec<ShoppingList>,
    customers: HashMap<CustomerId, StoredCustomer>,
    orders: HashMap<OrderId, Order>,
}

struct StoredCustomer {
    customer: Customer,
    password_hash: String,
}

impl InMemoryBackend {
    /// Create an empty backend selling the products of `catalog`.
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self {
            inner: Arc::new(InMemoryBackendInner {
                catalog,
                store: RwLock::new(Store::default()),
                interleaved_writes: AtomicUsize::new(0),
            }),
        }
    }

    /// The catalog this backend prices line items from.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Make the next `count` updates race against a simulated concurrent
    /// writer: the stored entity is modified just before the version check,
    /// so those updates fail with [`BackendError::Conflict`].
    pub fn interleave_concurrent_writes(&self, count: usize) {
        self.inner.interleaved_writes.store(count, Ordering::SeqCst);
    }

    fn take_interleaved_write(&self) -> bool {
        self.inner
            .interleaved_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Register a customer with a password.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::InvalidInput`] if the email is already taken
    /// or the password cannot be hashed.
    pub async fn register_customer(
        &self,
        email: Email,
        password: &str,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<Customer, BackendError> {
        let password_hash = hash_password(password)?;
        let mut store = self.inner.store.write().await;

        if store.customer_by_email(&email).is_some() {
            return Err(BackendError::InvalidInput(format!(
                "a customer with email {email} already exists"
            )));
        }

        let customer = Customer {
            id: CustomerId::generate(),
            version: Version::INITIAL,
            email,
            first_name,
            last_name,
            addresses: Vec::new(),
        };
        store.customers.insert(
            customer.id.clone(),
            StoredCustomer {
                customer: customer.clone(),
                password_hash,
            },
        );
        Ok(customer)
    }

    /// Add an address to a customer's address book, assigning it an id.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] for an unknown customer.
    pub async fn add_address(
        &self,
        customer_id: &CustomerId,
        mut address: Address,
    ) -> Result<Customer, BackendError> {
        let mut store = self.inner.store.write().await;
        let stored = store
            .customers
            .get_mut(customer_id)
            .ok_or_else(|| BackendError::NotFound(format!("customer {customer_id}")))?;

        address.id = Some(AddressId::generate());
        stored.customer.addresses.push(address);
        stored.customer.version = stored.customer.version.next();
        Ok(stored.customer.clone())
    }

    /// Record a placed order.
    pub async fn insert_order(&self, order: Order) {
        let mut store = self.inner.store.write().await;
        store.orders.insert(order.id.clone(), order);
    }

    fn priced_line_item(
        &self,
        cart: &Cart,
        product_id: &ProductId,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<LineItem, BackendError> {
        let product = self
            .inner
            .catalog
            .product(product_id)
            .filter(|product| product.variants.iter().any(|v| v.id == variant_id))
            .ok_or_else(|| {
                BackendError::NotFound(format!("product {product_id} variant {variant_id}"))
            })?;

        let variant = self
            .inner
            .catalog
            .price_variant(product_id, variant_id, cart.currency, cart.country.as_deref())
            .ok_or_else(|| {
                BackendError::InvalidInput(format!(
                    "product {product_id} variant {variant_id} has no price in {}",
                    cart.currency
                ))
            })?;

        Ok(LineItem {
            id: LineItemId::generate(),
            product_id: product.id.clone(),
            variant_id,
            name: variant.name,
            quantity,
            price: Some(variant.price),
        })
    }

    fn unpriced_line_item(
        &self,
        product_id: &ProductId,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<LineItem, BackendError> {
        let product = self
            .inner
            .catalog
            .product(product_id)
            .filter(|product| product.variants.iter().any(|v| v.id == variant_id))
            .ok_or_else(|| {
                BackendError::NotFound(format!("product {product_id} variant {variant_id}"))
            })?;

        Ok(LineItem {
            id: LineItemId::generate(),
            product_id: product.id.clone(),
            variant_id,
            name: product.name.clone(),
            quantity,
            price: None,
        })
    }

    fn apply_cart_action(&self, cart: &mut Cart, action: CartAction) -> Result<(), BackendError> {
        match action {
            CartAction::AddLineItem {
                product_id,
                variant_id,
                quantity,
            } => {
                ensure_positive(quantity)?;
                if let Some(existing) = cart
                    .line_items
                    .iter_mut()
                    .find(|item| item.is_variant(&product_id, variant_id))
                {
                    existing.quantity = within_limit(existing.quantity.saturating_add(quantity))?;
                } else {
                    let item = self.priced_line_item(cart, &product_id, variant_id, quantity)?;
                    cart.line_items.push(item);
                }
                Ok(())
            }
            CartAction::ChangeLineItemQuantity {
                line_item_id,
                quantity,
            } => change_quantity(&mut cart.line_items, &line_item_id, quantity),
            CartAction::RemoveLineItem { line_item_id } => {
                remove_line_item(&mut cart.line_items, &line_item_id)
            }
        }
    }

    fn apply_shopping_list_action(
        &self,
        list: &mut ShoppingList,
        action: ShoppingListAction,
    ) -> Result<(), BackendError> {
        match action {
            ShoppingListAction::AddLineItem {
                product_id,
                variant_id,
                quantity,
            } => {
                ensure_positive(quantity)?;
                if let Some(existing) = list
                    .line_items
                    .iter_mut()
                    .find(|item| item.is_variant(&product_id, variant_id))
                {
                    existing.quantity = within_limit(existing.quantity.saturating_add(quantity))?;
                } else {
                    let item = self.unpriced_line_item(&product_id, variant_id, quantity)?;
                    list.line_items.push(item);
                }
                Ok(())
            }
            ShoppingListAction::ChangeLineItemQuantity {
                line_item_id,
                quantity,
            } => change_quantity(&mut list.line_items, &line_item_id, quantity),
            ShoppingListAction::RemoveLineItem { line_item_id } => {
                remove_line_item(&mut list.line_items, &line_item_id)
            }
            ShoppingListAction::ChangeName { name } => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(BackendError::InvalidInput(
                        "shopping list name cannot be empty".to_string(),
                    ));
                }
                list.name = name.to_string();
                Ok(())
            }
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new(Catalog::demo())
    }
}

impl Store {
    fn customer_by_email(&self, email: &Email) -> Option<&StoredCustomer> {
        self.customers
            .values()
            .find(|stored| stored.customer.email == *email)
    }
}

// =============================================================================
// Action Helpers
// =============================================================================

fn ensure_positive(quantity: u32) -> Result<(), BackendError> {
    if quantity == 0 {
        return Err(BackendError::InvalidInput(
            "quantity must be at least 1".to_string(),
        ));
    }
    within_limit(quantity).map(drop)
}

fn within_limit(quantity: u32) -> Result<u32, BackendError> {
    if quantity > MAX_QUANTITY {
        return Err(BackendError::InvalidInput(format!(
            "quantity must be at most {MAX_QUANTITY}"
        )));
    }
    Ok(quantity)
}

fn change_quantity(
    items: &mut Vec<LineItem>,
    line_item_id: &LineItemId,
    quantity: u32,
) -> Result<(), BackendError> {
    if quantity == 0 {
        return remove_line_item(items, line_item_id);
    }
    within_limit(quantity)?;
    let item = items
        .iter_mut()
        .find(|item| item.id == *line_item_id)
        .ok_or_else(|| BackendError::NotFound(format!("line item {line_item_id}")))?;
    item.quantity = quantity;
    Ok(())
}

fn remove_line_item(items: &mut Vec<LineItem>, line_item_id: &LineItemId) -> Result<(), BackendError> {
    let before = items.len();
    items.retain(|item| item.id != *line_item_id);
    if items.len() == before {
        return Err(BackendError::NotFound(format!("line item {line_item_id}")));
    }
    Ok(())
}

fn check_version(expected: Version, actual: Version) -> Result<(), BackendError> {
    if expected != actual {
        return Err(BackendError::Conflict {
            expected,
            actual: Some(actual),
        });
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, BackendError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| BackendError::InvalidInput("password could not be hashed".to_string()))
}

fn verify_password(password: &str, hash: &str) -> Result<(), BackendError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| BackendError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| BackendError::InvalidCredentials)
}

// =============================================================================
// CommerceBackend
// =============================================================================

#[async_trait]
impl CommerceBackend for InMemoryBackend {
    async fn get_cart(&self, id: &CartId) -> Result<Option<Cart>, BackendError> {
        Ok(self.inner.store.read().await.carts.get(id).cloned())
    }

    #[instrument(skip(self), fields(owner = %draft.owner))]
    async fn create_cart(&self, draft: CartDraft) -> Result<Cart, BackendError> {
        let cart = Cart {
            id: CartId::generate(),
            version: Version::INITIAL,
            owner: draft.owner,
            locale: Some(draft.locale),
            currency: draft.currency,
            country: Some(draft.country),
            line_items: Vec::new(),
        };
        debug!(cart_id = %cart.id, "Created cart");

        let mut store = self.inner.store.write().await;
        store.carts.insert(cart.id.clone(), cart.clone());
        Ok(cart)
    }

    #[instrument(skip(self, update), fields(cart_id = %update.id(), version = %update.version()))]
    async fn update_cart(&self, update: CartUpdate) -> Result<Cart, BackendError> {
        let (id, version, actions) = update.into_parts();
        let mut store = self.inner.store.write().await;
        let stored = store
            .carts
            .get_mut(&id)
            .ok_or_else(|| BackendError::NotFound(format!("cart {id}")))?;

        if self.take_interleaved_write() {
            stored.version = stored.version.next();
        }
        check_version(version, stored.version)?;

        let mut cart = stored.clone();
        for action in actions {
            self.apply_cart_action(&mut cart, action)?;
        }
        cart.version = cart.version.next();
        *stored = cart.clone();
        Ok(cart)
    }

    async fn find_variant(
        &self,
        product_id: &ProductId,
        variant_id: VariantId,
        currency: CurrencyCode,
        country: &str,
    ) -> Result<Option<ProductVariant>, BackendError> {
        Ok(self
            .inner
            .catalog
            .price_variant(product_id, variant_id, currency, Some(country)))
    }

    async fn query_shopping_lists(
        &self,
        owner: &Principal,
    ) -> Result<Vec<ShoppingList>, BackendError> {
        let store = self.inner.store.read().await;
        Ok(store
            .shopping_lists
            .iter()
            .filter(|list| list.owner == *owner)
            .cloned()
            .collect())
    }

    async fn get_shopping_list(
        &self,
        id: &ShoppingListId,
    ) -> Result<Option<ShoppingList>, BackendError> {
        let store = self.inner.store.read().await;
        Ok(store
            .shopping_lists
            .iter()
            .find(|list| list.id == *id)
            .cloned())
    }

    #[instrument(skip(self), fields(owner = %draft.owner))]
    async fn create_shopping_list(
        &self,
        draft: ShoppingListDraft,
    ) -> Result<ShoppingList, BackendError> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(BackendError::InvalidInput(
                "shopping list name cannot be empty".to_string(),
            ));
        }

        let list = ShoppingList {
            id: ShoppingListId::generate(),
            version: Version::INITIAL,
            owner: draft.owner,
            name: name.to_string(),
            line_items: Vec::new(),
            created_at: Utc::now(),
        };

        let mut store = self.inner.store.write().await;
        store.shopping_lists.push(list.clone());
        Ok(list)
    }

    #[instrument(skip(self, update), fields(list_id = %update.id(), version = %update.version()))]
    async fn update_shopping_list(
        &self,
        update: ShoppingListUpdate,
    ) -> Result<ShoppingList, BackendError> {
        let (id, version, actions) = update.into_parts();
        let mut store = self.inner.store.write().await;
        let stored = store
            .shopping_lists
            .iter_mut()
            .find(|list| list.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("shopping list {id}")))?;

        if self.take_interleaved_write() {
            stored.version = stored.version.next();
        }
        check_version(version, stored.version)?;

        let mut list = stored.clone();
        for action in actions {
            self.apply_shopping_list_action(&mut list, action)?;
        }
        list.version = list.version.next();
        *stored = list.clone();
        Ok(list)
    }

    #[instrument(skip(self))]
    async fn delete_shopping_list(
        &self,
        id: &ShoppingListId,
        version: Version,
    ) -> Result<(), BackendError> {
        let mut store = self.inner.store.write().await;
        let (position, current) = store
            .shopping_lists
            .iter()
            .enumerate()
            .find(|(_, list)| list.id == *id)
            .map(|(position, list)| (position, list.version))
            .ok_or_else(|| BackendError::NotFound(format!("shopping list {id}")))?;
        check_version(version, current)?;

        store.shopping_lists.remove(position);
        Ok(())
    }

    #[instrument(skip(self, password))]
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Customer, BackendError> {
        let store = self.inner.store.read().await;
        let stored = store
            .customer_by_email(email)
            .ok_or(BackendError::InvalidCredentials)?;
        verify_password(password.expose_secret(), &stored.password_hash)?;
        Ok(stored.customer.clone())
    }

    async fn get_customer(&self, id: &CustomerId) -> Result<Option<Customer>, BackendError> {
        let store = self.inner.store.read().await;
        Ok(store.customers.get(id).map(|stored| stored.customer.clone()))
    }

    #[instrument(skip(self, update), fields(customer_id = %update.id(), version = %update.version()))]
    async fn update_customer(&self, update: CustomerUpdate) -> Result<Customer, BackendError> {
        let (id, version, actions) = update.into_parts();
        let mut store = self.inner.store.write().await;

        let new_email = actions.iter().rev().find_map(|action| match action {
            CustomerAction::ChangeEmail(email) => Some(email.clone()),
            _ => None,
        });
        if let Some(email) = &new_email
            && store
                .customer_by_email(email)
                .is_some_and(|other| other.customer.id != id)
        {
            return Err(BackendError::InvalidInput(format!(
                "a customer with email {email} already exists"
            )));
        }

        let interleaved = self.take_interleaved_write();
        let stored = store
            .customers
            .get_mut(&id)
            .ok_or_else(|| BackendError::NotFound(format!("customer {id}")))?;

        if interleaved {
            stored.customer.version = stored.customer.version.next();
        }
        check_version(version, stored.customer.version)?;

        let mut customer = stored.customer.clone();
        for action in actions {
            match action {
                CustomerAction::SetFirstName(name) => customer.first_name = name,
                CustomerAction::SetLastName(name) => customer.last_name = name,
                CustomerAction::ChangeEmail(email) => customer.email = email,
                CustomerAction::ChangeAddress {
                    address_id,
                    mut address,
                } => {
                    let slot = customer
                        .addresses
                        .iter_mut()
                        .find(|existing| existing.id.as_ref() == Some(&address_id))
                        .ok_or_else(|| BackendError::NotFound(format!("address {address_id}")))?;
                    address.id = Some(address_id);
                    *slot = address;
                }
            }
        }
        customer.version = customer.version.next();
        stored.customer = customer.clone();
        Ok(customer)
    }

    async fn query_orders(&self, customer_id: &CustomerId) -> Result<Vec<Order>, BackendError> {
        let store = self.inner.store.read().await;
        let mut orders: Vec<Order> = store
            .orders
            .values()
            .filter(|order| order.customer_id.as_ref() == Some(customer_id))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn get_order(&self, id: &OrderId) -> Result<Option<Order>, BackendError> {
        Ok(self.inner.store.read().await.orders.get(id).cloned())
    }

    async fn ping(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use basket_core::{Locale, Money};

    use super::*;

    fn variant(n: u32) -> VariantId {
        VariantId::new(n).unwrap()
    }

    async fn new_cart(backend: &InMemoryBackend) -> Cart {
        backend
            .create_cart(CartDraft {
                owner: Principal::anonymous("sess1"),
                locale: Locale::parse("de-DE").unwrap(),
                currency: CurrencyCode::EUR,
                country: "DE".to_string(),
            })
            .await
            .unwrap()
    }

    fn add(product: &str, variant_id: u32, quantity: u32) -> CartAction {
        CartAction::AddLineItem {
            product_id: ProductId::new(product),
            variant_id: variant(variant_id),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_update_cart_merges_same_variant() {
        let backend = InMemoryBackend::default();
        let cart = new_cart(&backend).await;

        let cart = backend
            .update_cart(
                CartUpdate::new(cart.id.clone(), cart.version)
                    .with(add("P1", 1, 2))
                    .with(add("P1", 1, 1)),
            )
            .await
            .unwrap();

        assert_eq!(cart.version, Version::new(2));
        assert_eq!(cart.line_items.len(), 1);
        assert_eq!(cart.line_items.first().unwrap().quantity, 3);
        assert_eq!(
            cart.total_price(),
            Money::from_cents(3 * 1299, CurrencyCode::EUR)
        );
    }

    #[tokio::test]
    async fn test_merging_past_the_quantity_limit_is_rejected() {
        let backend = InMemoryBackend::default();
        let cart = new_cart(&backend).await;
        let cart = backend
            .update_cart(
                CartUpdate::new(cart.id.clone(), cart.version).with(add("P1", 1, MAX_QUANTITY)),
            )
            .await
            .unwrap();

        let result = backend
            .update_cart(CartUpdate::new(cart.id.clone(), cart.version).with(add("P1", 1, 1)))
            .await;
        assert!(matches!(result, Err(BackendError::InvalidInput(_))));

        let stored = backend.get_cart(&cart.id).await.unwrap().unwrap();
        assert_eq!(stored.total_quantity(), MAX_QUANTITY);
        assert_eq!(stored.version, cart.version);
    }

    #[tokio::test]
    async fn test_update_cart_stale_version_conflicts() {
        let backend = InMemoryBackend::default();
        let cart = new_cart(&backend).await;
        backend
            .update_cart(CartUpdate::new(cart.id.clone(), cart.version).with(add("P1", 1, 1)))
            .await
            .unwrap();

        let err = backend
            .update_cart(CartUpdate::new(cart.id.clone(), cart.version).with(add("P2", 1, 1)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BackendError::Conflict {
                actual: Some(v),
                ..
            } if v == Version::new(2)
        ));
    }

    #[tokio::test]
    async fn test_update_cart_is_all_or_nothing() {
        let backend = InMemoryBackend::default();
        let cart = new_cart(&backend).await;

        let err = backend
            .update_cart(
                CartUpdate::new(cart.id.clone(), cart.version)
                    .with(add("P1", 1, 1))
                    .with(add("NOPE", 1, 1)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));

        let stored = backend.get_cart(&cart.id).await.unwrap().unwrap();
        assert!(stored.is_empty());
        assert_eq!(stored.version, Version::INITIAL);
    }

    #[tokio::test]
    async fn test_zero_quantity_removes_line() {
        let backend = InMemoryBackend::default();
        let cart = new_cart(&backend).await;
        let cart = backend
            .update_cart(CartUpdate::new(cart.id.clone(), cart.version).with(add("P1", 1, 2)))
            .await
            .unwrap();
        let line_item_id = cart.line_items.first().unwrap().id.clone();

        let cart = backend
            .update_cart(CartUpdate::new(cart.id.clone(), cart.version).with(
                CartAction::ChangeLineItemQuantity {
                    line_item_id: line_item_id.clone(),
                    quantity: 0,
                },
            ))
            .await
            .unwrap();
        assert!(cart.line_item(&line_item_id).is_none());
    }

    #[tokio::test]
    async fn test_interleaved_write_causes_conflict_once() {
        let backend = InMemoryBackend::default();
        let cart = new_cart(&backend).await;
        backend.interleave_concurrent_writes(1);

        let err = backend
            .update_cart(CartUpdate::new(cart.id.clone(), cart.version).with(add("P1", 1, 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Conflict { .. }));

        let current = backend.get_cart(&cart.id).await.unwrap().unwrap();
        assert!(
            backend
                .update_cart(CartUpdate::new(cart.id, current.version).with(add("P1", 1, 1)))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_shopping_lists_in_creation_order_and_delete() {
        let backend = InMemoryBackend::default();
        let owner = Principal::customer("c1");
        for name in ["Birthday", "Groceries"] {
            backend
                .create_shopping_list(ShoppingListDraft {
                    owner: owner.clone(),
                    name: name.to_string(),
                    locale: Locale::parse("en").unwrap(),
                })
                .await
                .unwrap();
        }
        backend
            .create_shopping_list(ShoppingListDraft {
                owner: Principal::customer("c2"),
                name: "Other".to_string(),
                locale: Locale::parse("en").unwrap(),
            })
            .await
            .unwrap();

        let lists = backend.query_shopping_lists(&owner).await.unwrap();
        let names: Vec<_> = lists.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Birthday", "Groceries"]);

        let first = lists.first().unwrap();
        backend
            .delete_shopping_list(&first.id, first.version)
            .await
            .unwrap();
        assert!(matches!(
            backend.delete_shopping_list(&first.id, first.version).await,
            Err(BackendError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_sign_in_verifies_password() {
        let backend = InMemoryBackend::default();
        let email = Email::parse("jo@example.com").unwrap();
        backend
            .register_customer(email.clone(), "correct horse", None, None)
            .await
            .unwrap();

        let ok = backend
            .sign_in(&email, &SecretString::from("correct horse".to_string()))
            .await;
        assert!(ok.is_ok());

        let wrong = backend
            .sign_in(&email, &SecretString::from("battery staple".to_string()))
            .await;
        assert!(matches!(wrong, Err(BackendError::InvalidCredentials)));

        let unknown = backend
            .sign_in(
                &Email::parse("nobody@example.com").unwrap(),
                &SecretString::from("x".to_string()),
            )
            .await;
        assert!(matches!(unknown, Err(BackendError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_change_unknown_address_is_not_found() {
        let backend = InMemoryBackend::default();
        let customer = backend
            .register_customer(Email::parse("a@b.io").unwrap(), "pw-pw-pw", None, None)
            .await
            .unwrap();
        let customer = backend
            .add_address(
                &customer.id,
                Address {
                    country: "DE".to_string(),
                    ..Address::default()
                },
            )
            .await
            .unwrap();

        let err = backend
            .update_customer(
                CustomerUpdate::new(customer.id.clone(), customer.version)
                    .with(CustomerAction::SetFirstName(Some("Ada".to_string())))
                    .with(CustomerAction::ChangeAddress {
                        address_id: AddressId::new("missing"),
                        address: Address::default(),
                    }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));

        let stored = backend.get_customer(&customer.id).await.unwrap().unwrap();
        assert_eq!(stored.first_name, None);
    }
}
