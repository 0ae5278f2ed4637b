//! Payment processing step.

use async_trait::async_trait;

use crate::context::SagaContext;
use crate::error::{Result, SagaError};
use crate::services::PaymentGateway;
use crate::step::SagaStep;

/// Step name for [`ProcessPaymentStep`].
pub const NAME: &str = "process_payment";

/// Charges the customer for the order total.
///
/// Compensation refunds the charge.
pub struct ProcessPaymentStep<P: PaymentGateway> {
    gateway: P,
}

impl<P: PaymentGateway> ProcessPaymentStep<P> {
    /// Creates the step with its payment gateway collaborator.
    pub fn new(gateway: P) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl<P: PaymentGateway> SagaStep for ProcessPaymentStep<P> {
    fn name(&self) -> &str {
        NAME
    }

    async fn execute(&self, ctx: &mut SagaContext) -> Result<()> {
        let order_id = ctx
            .order_id()
            .ok_or_else(|| SagaError::InvalidContext("no order to charge for".to_string()))?;
        if ctx.total().is_zero() {
            return Err(SagaError::InvalidContext("order total is zero".to_string()));
        }

        let result = self
            .gateway
            .charge(order_id, ctx.customer_id(), ctx.total())
            .await?;
        ctx.record_payment(result.payment_id);
        Ok(())
    }

    async fn compensate(&self, ctx: &mut SagaContext) -> Result<()> {
        if !ctx.payment_processed() {
            return Ok(());
        }
        let Some(payment_id) = ctx.payment_id().map(str::to_string) else {
            return Ok(());
        };

        self.gateway.refund(&payment_id).await?;
        ctx.clear_payment();
        Ok(())
    }
}
