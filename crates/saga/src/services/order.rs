//! Order store trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{CustomerId, Money, OrderId, OrderItem};

use crate::error::SagaError;

/// Status of an order held in the store.
///
/// Compensation for order creation is a semantic undo: the order is
/// marked cancelled, never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Open,
    Cancelled,
}

/// Trait for order persistence operations.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Creates an order for the customer and returns its ID.
    async fn create(
        &self,
        customer_id: CustomerId,
        items: Vec<OrderItem>,
        total: Money,
    ) -> Result<OrderId, SagaError>;

    /// Marks a previously created order as cancelled.
    async fn cancel(&self, order_id: OrderId) -> Result<(), SagaError>;
}

#[derive(Debug, Default)]
struct InMemoryOrderState {
    orders: HashMap<OrderId, (CustomerId, Vec<OrderItem>, Money, OrderStatus)>,
    fail_on_create: bool,
    fail_on_cancel: bool,
}

/// In-memory order store for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<InMemoryOrderState>>,
}

impl InMemoryOrderStore {
    /// Creates a new in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail on the next create call.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Configures the store to fail on the next cancel call.
    pub fn set_fail_on_cancel(&self, fail: bool) {
        self.state.write().unwrap().fail_on_cancel = fail;
    }

    /// Returns the number of orders in the store, cancelled included.
    pub fn order_count(&self) -> usize {
        self.state.read().unwrap().orders.len()
    }

    /// Returns the number of open (not cancelled) orders.
    pub fn open_order_count(&self) -> usize {
        self.state
            .read()
            .unwrap()
            .orders
            .values()
            .filter(|(_, _, _, status)| *status == OrderStatus::Open)
            .count()
    }

    /// Returns true if the order exists and is marked cancelled.
    pub fn is_cancelled(&self, order_id: OrderId) -> bool {
        self.state
            .read()
            .unwrap()
            .orders
            .get(&order_id)
            .is_some_and(|(_, _, _, status)| *status == OrderStatus::Cancelled)
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(
        &self,
        customer_id: CustomerId,
        items: Vec<OrderItem>,
        total: Money,
    ) -> Result<OrderId, SagaError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(SagaError::OrderStore("Order store unavailable".to_string()));
        }

        let order_id = OrderId::new();
        state
            .orders
            .insert(order_id, (customer_id, items, total, OrderStatus::Open));

        Ok(order_id)
    }

    async fn cancel(&self, order_id: OrderId) -> Result<(), SagaError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_cancel {
            return Err(SagaError::OrderStore("Order store unavailable".to_string()));
        }

        if let Some((_, _, _, status)) = state.orders.get_mut(&order_id) {
            *status = OrderStatus::Cancelled;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_items() -> Vec<OrderItem> {
        vec![OrderItem::new(
            "SKU-001",
            "Widget",
            2,
            Money::from_cents(1000),
        )]
    }

    #[tokio::test]
    async fn test_create_and_cancel() {
        let store = InMemoryOrderStore::new();
        let customer_id = CustomerId::new();

        let order_id = store
            .create(customer_id, sample_items(), Money::from_cents(2000))
            .await
            .unwrap();
        assert_eq!(store.order_count(), 1);
        assert_eq!(store.open_order_count(), 1);
        assert!(!store.is_cancelled(order_id));

        store.cancel(order_id).await.unwrap();
        // Cancelled, not deleted
        assert_eq!(store.order_count(), 1);
        assert_eq!(store.open_order_count(), 0);
        assert!(store.is_cancelled(order_id));
    }

    #[tokio::test]
    async fn test_cancel_unknown_order_is_noop() {
        let store = InMemoryOrderStore::new();
        store.cancel(OrderId::new()).await.unwrap();
        assert_eq!(store.order_count(), 0);
    }

    #[tokio::test]
    async fn test_fail_on_create() {
        let store = InMemoryOrderStore::new();
        store.set_fail_on_create(true);

        let result = store
            .create(CustomerId::new(), sample_items(), Money::from_cents(2000))
            .await;
        assert!(result.is_err());
        assert_eq!(store.order_count(), 0);
    }
}
