//! Order history service. Orders are read-only here.

use std::sync::Arc;

use tracing::{instrument, warn};

use basket_core::{CustomerId, OrderId};

use crate::backend::{CommerceBackend, Order};
use crate::services::ServiceError;

#[derive(Clone)]
pub struct OrderManager {
    backend: Arc<dyn CommerceBackend>,
}

impl OrderManager {
    #[must_use]
    pub fn new(backend: Arc<dyn CommerceBackend>) -> Self {
        Self { backend }
    }

    /// Orders of a customer, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    #[instrument(skip(self))]
    pub async fn get_orders(&self, customer_id: &CustomerId) -> Result<Vec<Order>, ServiceError> {
        let mut orders = self.backend.query_orders(customer_id).await?;
        orders.retain(|order| order.customer_id.as_ref() == Some(customer_id));
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// A single order placed by `customer_id`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFound`] if the order does not exist
    /// - [`ServiceError::Forbidden`] if someone else placed it
    #[instrument(skip(self))]
    pub async fn get_order(
        &self,
        order_id: &OrderId,
        customer_id: &CustomerId,
    ) -> Result<Order, ServiceError> {
        let order = self
            .backend
            .get_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {order_id}")))?;

        if order.customer_id.as_ref() != Some(customer_id) {
            warn!(%order_id, "Order requested by a different customer");
            return Err(ServiceError::Forbidden(format!("order {order_id}")));
        }
        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};

    use basket_core::{CurrencyCode, Money};

    use super::*;
    use crate::backend::InMemoryBackend;

    fn order(id: &str, customer: &str, age_days: i64) -> Order {
        Order {
            id: OrderId::new(id),
            order_number: Some(format!("#{id}")),
            customer_id: Some(CustomerId::new(customer)),
            line_items: Vec::new(),
            total: Money::from_cents(1000, CurrencyCode::EUR),
            created_at: Utc::now() - Duration::days(age_days),
        }
    }

    async fn setup() -> OrderManager {
        let backend = InMemoryBackend::default();
        backend.insert_order(order("o-old", "c-1", 10)).await;
        backend.insert_order(order("o-new", "c-1", 1)).await;
        backend.insert_order(order("o-other", "c-2", 3)).await;
        OrderManager::new(Arc::new(backend))
    }

    #[tokio::test]
    async fn test_get_orders_newest_first() {
        let orders = setup().await;
        let ids: Vec<String> = orders
            .get_orders(&CustomerId::new("c-1"))
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id.to_string())
            .collect();
        assert_eq!(ids, ["o-new", "o-old"]);
    }

    #[tokio::test]
    async fn test_get_order_ownership() {
        let orders = setup().await;
        let mine = CustomerId::new("c-1");

        assert!(orders.get_order(&OrderId::new("o-new"), &mine).await.is_ok());
        assert!(matches!(
            orders.get_order(&OrderId::new("o-other"), &mine).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            orders.get_order(&OrderId::new("o-missing"), &mine).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
