//! Stock reservation step.

use async_trait::async_trait;

use crate::context::SagaContext;
use crate::error::{Result, SagaError};
use crate::services::StockService;
use crate::step::SagaStep;

/// Step name for [`ReserveStockStep`].
pub const NAME: &str = "reserve_stock";

/// Reserves stock for the order's items.
///
/// Requires the order to have been created first (the reservation is
/// keyed on the order ID). Compensation releases the reservation.
pub struct ReserveStockStep<S: StockService> {
    stock: S,
}

impl<S: StockService> ReserveStockStep<S> {
    /// Creates the step with its stock service collaborator.
    pub fn new(stock: S) -> Self {
        Self { stock }
    }
}

#[async_trait]
impl<S: StockService> SagaStep for ReserveStockStep<S> {
    fn name(&self) -> &str {
        NAME
    }

    async fn execute(&self, ctx: &mut SagaContext) -> Result<()> {
        let order_id = ctx
            .order_id()
            .ok_or_else(|| SagaError::InvalidContext("no order to reserve for".to_string()))?;

        let result = self.stock.reserve(order_id, ctx.items().to_vec()).await?;
        ctx.record_reservation(result.reservation_id);
        Ok(())
    }

    async fn compensate(&self, ctx: &mut SagaContext) -> Result<()> {
        if !ctx.stock_reserved() {
            return Ok(());
        }
        let Some(reservation_id) = ctx.reservation_id().map(str::to_string) else {
            return Ok(());
        };

        self.stock.release(&reservation_id).await?;
        ctx.clear_reservation();
        Ok(())
    }
}
