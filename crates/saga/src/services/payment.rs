//! Payment gateway trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{CustomerId, Money, OrderId};

use crate::error::SagaError;

/// Result of a successful charge.
#[derive(Debug, Clone)]
pub struct ChargeResult {
    /// The payment ID assigned by the gateway.
    pub payment_id: String,
}

/// Trait for payment processing operations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charges a customer for an order.
    async fn charge(
        &self,
        order_id: OrderId,
        customer_id: CustomerId,
        amount: Money,
    ) -> Result<ChargeResult, SagaError>;

    /// Refunds a previously made payment.
    async fn refund(&self, payment_id: &str) -> Result<(), SagaError>;
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    payments: HashMap<String, (OrderId, CustomerId, Money)>,
    next_id: u32,
    fail_on_charge: bool,
    fail_on_refund: bool,
}

/// In-memory payment gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory payment gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to fail on the next charge call.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.state.write().unwrap().fail_on_charge = fail;
    }

    /// Configures the gateway to fail on the next refund call.
    pub fn set_fail_on_refund(&self, fail: bool) {
        self.state.write().unwrap().fail_on_refund = fail;
    }

    /// Returns the number of standing payments.
    pub fn payment_count(&self) -> usize {
        self.state.read().unwrap().payments.len()
    }

    /// Returns true if a payment exists with the given ID.
    pub fn has_payment(&self, payment_id: &str) -> bool {
        self.state.read().unwrap().payments.contains_key(payment_id)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn charge(
        &self,
        order_id: OrderId,
        customer_id: CustomerId,
        amount: Money,
    ) -> Result<ChargeResult, SagaError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_charge {
            return Err(SagaError::Payment("Payment declined".to_string()));
        }

        state.next_id += 1;
        let payment_id = format!("PAY-{:04}", state.next_id);
        state
            .payments
            .insert(payment_id.clone(), (order_id, customer_id, amount));

        Ok(ChargeResult { payment_id })
    }

    async fn refund(&self, payment_id: &str) -> Result<(), SagaError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_refund {
            return Err(SagaError::Payment("Gateway unavailable".to_string()));
        }

        state.payments.remove(payment_id);
        Ok(())
    }
}
