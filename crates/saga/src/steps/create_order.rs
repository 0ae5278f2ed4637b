//! Order creation step.

use async_trait::async_trait;

use crate::context::SagaContext;
use crate::error::{Result, SagaError};
use crate::services::OrderStore;
use crate::step::SagaStep;

/// Step name for [`CreateOrderStep`].
pub const NAME: &str = "create_order";

/// Creates the order in the order store.
///
/// Compensation is a semantic undo: the order is marked cancelled in
/// the store, not deleted, and the context keeps the order ID for
/// reporting.
pub struct CreateOrderStep<O: OrderStore> {
    store: O,
}

impl<O: OrderStore> CreateOrderStep<O> {
    /// Creates the step with its order store collaborator.
    pub fn new(store: O) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<O: OrderStore> SagaStep for CreateOrderStep<O> {
    fn name(&self) -> &str {
        NAME
    }

    async fn execute(&self, ctx: &mut SagaContext) -> Result<()> {
        if ctx.items().is_empty() {
            return Err(SagaError::InvalidContext("order has no items".to_string()));
        }

        let order_id = self
            .store
            .create(ctx.customer_id(), ctx.items().to_vec(), ctx.total())
            .await?;
        ctx.record_order(order_id);
        Ok(())
    }

    async fn compensate(&self, ctx: &mut SagaContext) -> Result<()> {
        if !ctx.order_created() {
            return Ok(());
        }
        let order_id = ctx
            .order_id()
            .ok_or_else(|| SagaError::InvalidContext("order flag set without ID".to_string()))?;

        self.store.cancel(order_id).await?;
        ctx.clear_order();
        Ok(())
    }
}
