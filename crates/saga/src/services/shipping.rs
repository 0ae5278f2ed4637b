//! Shipment service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::OrderId;

use crate::error::SagaError;

/// Result of a successful shipment creation.
#[derive(Debug, Clone)]
pub struct ShipmentResult {
    /// The tracking number assigned by the shipment service.
    pub tracking_number: String,
}

/// Trait for shipment operations.
#[async_trait]
pub trait ShipmentService: Send + Sync {
    /// Creates a shipment for an order.
    async fn create(&self, order_id: OrderId) -> Result<ShipmentResult, SagaError>;

    /// Cancels a previously created shipment.
    async fn cancel(&self, tracking_number: &str) -> Result<(), SagaError>;
}

#[derive(Debug, Default)]
struct InMemoryShipmentState {
    shipments: HashMap<String, OrderId>,
    next_id: u32,
    fail_on_create: bool,
    fail_on_cancel: bool,
}

/// In-memory shipment service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryShipmentService {
    state: Arc<RwLock<InMemoryShipmentState>>,
}

impl InMemoryShipmentService {
    /// Creates a new in-memory shipment service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail on the next create call.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Configures the service to fail on the next cancel call.
    pub fn set_fail_on_cancel(&self, fail: bool) {
        self.state.write().unwrap().fail_on_cancel = fail;
    }

    /// Returns the number of active shipments.
    pub fn shipment_count(&self) -> usize {
        self.state.read().unwrap().shipments.len()
    }

    /// Returns true if a shipment exists with the given tracking number.
    pub fn has_shipment(&self, tracking_number: &str) -> bool {
        self.state
            .read()
            .unwrap()
            .shipments
            .contains_key(tracking_number)
    }
}

#[async_trait]
impl ShipmentService for InMemoryShipmentService {
    async fn create(&self, order_id: OrderId) -> Result<ShipmentResult, SagaError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(SagaError::Shipment("Shipping unavailable".to_string()));
        }

        state.next_id += 1;
        let tracking_number = format!("TRACK-{:04}", state.next_id);
        state.shipments.insert(tracking_number.clone(), order_id);

        Ok(ShipmentResult { tracking_number })
    }

    async fn cancel(&self, tracking_number: &str) -> Result<(), SagaError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_cancel {
            return Err(SagaError::Shipment("Shipping unavailable".to_string()));
        }

        state.shipments.remove(tracking_number);
        Ok(())
    }
}
