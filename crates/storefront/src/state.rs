//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::backend::CommerceBackend;
use crate::config::StorefrontConfig;
use crate::services::{CartManager, CustomerManager, OrderManager, ShoppingListManager};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. All services share one
/// backend client.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: Option<PgPool>,
    backend: Arc<dyn CommerceBackend>,
    carts: CartManager,
    shopping_lists: ShoppingListManager,
    customers: CustomerManager,
    orders: OrderManager,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `backend` - Commerce backend client
    /// * `pool` - Session database pool, when sessions are persisted
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        backend: Arc<dyn CommerceBackend>,
        pool: Option<PgPool>,
    ) -> Self {
        let carts = CartManager::new(Arc::clone(&backend), config.markets.clone());
        let shopping_lists = ShoppingListManager::new(Arc::clone(&backend));
        let customers = CustomerManager::new(Arc::clone(&backend));
        let orders = OrderManager::new(Arc::clone(&backend));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                backend,
                carts,
                shopping_lists,
                customers,
                orders,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Session database pool, if sessions are persisted.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    /// Get a reference to the commerce backend client.
    #[must_use]
    pub fn backend(&self) -> &dyn CommerceBackend {
        self.inner.backend.as_ref()
    }

    #[must_use]
    pub fn carts(&self) -> &CartManager {
        &self.inner.carts
    }

    #[must_use]
    pub fn shopping_lists(&self) -> &ShoppingListManager {
        &self.inner.shopping_lists
    }

    #[must_use]
    pub fn customers(&self) -> &CustomerManager {
        &self.inner.customers
    }

    #[must_use]
    pub fn orders(&self) -> &OrderManager {
        &self.inner.orders
    }
}
