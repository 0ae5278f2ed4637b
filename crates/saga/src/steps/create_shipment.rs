//! Shipment creation step.

use async_trait::async_trait;

use crate::context::SagaContext;
use crate::error::{Result, SagaError};
use crate::services::ShipmentService;
use crate::step::SagaStep;

/// Step name for [`CreateShipmentStep`].
pub const NAME: &str = "create_shipment";

/// Creates the shipment for the order.
///
/// Compensation cancels the shipment.
pub struct CreateShipmentStep<S: ShipmentService> {
    shipping: S,
}

impl<S: ShipmentService> CreateShipmentStep<S> {
    /// Creates the step with its shipment service collaborator.
    pub fn new(shipping: S) -> Self {
        Self { shipping }
    }
}

#[async_trait]
impl<S: ShipmentService> SagaStep for CreateShipmentStep<S> {
    fn name(&self) -> &str {
        NAME
    }

    async fn execute(&self, ctx: &mut SagaContext) -> Result<()> {
        let order_id = ctx
            .order_id()
            .ok_or_else(|| SagaError::InvalidContext("no order to ship".to_string()))?;

        let result = self.shipping.create(order_id).await?;
        ctx.record_shipment(result.tracking_number);
        Ok(())
    }

    async fn compensate(&self, ctx: &mut SagaContext) -> Result<()> {
        if !ctx.shipment_created() {
            return Ok(());
        }
        let Some(tracking_number) = ctx.tracking_number().map(str::to_string) else {
            return Ok(());
        };

        self.shipping.cancel(&tracking_number).await?;
        ctx.clear_shipment();
        Ok(())
    }
}
