//! Stock service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{OrderId, OrderItem};

use crate::error::SagaError;

/// Result of a successful stock reservation.
#[derive(Debug, Clone)]
pub struct ReservationResult {
    /// The reservation ID assigned by the stock service.
    pub reservation_id: String,
}

/// Trait for stock reservation operations.
#[async_trait]
pub trait StockService: Send + Sync {
    /// Reserves stock for the given order items.
    async fn reserve(
        &self,
        order_id: OrderId,
        items: Vec<OrderItem>,
    ) -> Result<ReservationResult, SagaError>;

    /// Releases a previously made reservation. Releasing an unknown
    /// reservation is a no-op, so compensation can be retried safely.
    async fn release(&self, reservation_id: &str) -> Result<(), SagaError>;
}

#[derive(Debug, Default)]
struct InMemoryStockState {
    reservations: HashMap<String, (OrderId, Vec<OrderItem>)>,
    next_id: u32,
    fail_on_reserve: bool,
    fail_on_release: bool,
}

/// In-memory stock service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStockService {
    state: Arc<RwLock<InMemoryStockState>>,
}

impl InMemoryStockService {
    /// Creates a new in-memory stock service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail on the next reserve call.
    pub fn set_fail_on_reserve(&self, fail: bool) {
        self.state.write().unwrap().fail_on_reserve = fail;
    }

    /// Configures the service to fail on the next release call.
    pub fn set_fail_on_release(&self, fail: bool) {
        self.state.write().unwrap().fail_on_release = fail;
    }

    /// Returns the number of active reservations.
    pub fn reservation_count(&self) -> usize {
        self.state.read().unwrap().reservations.len()
    }

    /// Returns true if a reservation exists with the given ID.
    pub fn has_reservation(&self, reservation_id: &str) -> bool {
        self.state
            .read()
            .unwrap()
            .reservations
            .contains_key(reservation_id)
    }
}

#[async_trait]
impl StockService for InMemoryStockService {
    async fn reserve(
        &self,
        order_id: OrderId,
        items: Vec<OrderItem>,
    ) -> Result<ReservationResult, SagaError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_reserve {
            return Err(SagaError::Stock("Insufficient stock".to_string()));
        }

        state.next_id += 1;
        let reservation_id = format!("RES-{:04}", state.next_id);
        state
            .reservations
            .insert(reservation_id.clone(), (order_id, items));

        Ok(ReservationResult { reservation_id })
    }

    async fn release(&self, reservation_id: &str) -> Result<(), SagaError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_release {
            return Err(SagaError::Stock("Stock service unavailable".to_string()));
        }

        state.reservations.remove(reservation_id);
        Ok(())
    }
}
