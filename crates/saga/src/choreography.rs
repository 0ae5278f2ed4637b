//! Choreography topology: steps reacting to each other's events.
//!
//! Instead of a central coordinator, each stage subscribes to the
//! previous stage's completion event on the [`EventBus`]. A failure
//! anywhere publishes `SagaFailed`, which triggers compensation of
//! every previously completed step in reverse completion order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use common::RunId;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::bus::{EventBus, EventHandler};
use crate::context::SagaContext;
use crate::error::{Result, SagaError};
use crate::result::{CompensationError, SagaResult};
use crate::step::SagaStep;

/// Events published on the bus as a saga run progresses.
///
/// Forward events are named for the domain transition they announce
/// and carry the full context plus the ordered list of completed step
/// names; `SagaFailed` additionally carries the failing step and
/// reason so the compensation handler knows what to undo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SagaFlowEvent {
    /// A new run begins; triggers the first stage.
    SagaStarted { context: SagaContext },

    /// The order was created; triggers stock reservation.
    OrderCreated {
        context: SagaContext,
        completed: Vec<String>,
    },

    /// Stock was reserved; triggers payment.
    StockReserved {
        context: SagaContext,
        completed: Vec<String>,
    },

    /// Payment went through; triggers shipment creation.
    PaymentProcessed {
        context: SagaContext,
        completed: Vec<String>,
    },

    /// The shipment exists; the forward chain is done.
    ShipmentCreated {
        context: SagaContext,
        completed: Vec<String>,
    },

    /// Every stage completed (terminal).
    SagaCompleted {
        context: SagaContext,
        completed: Vec<String>,
    },

    /// A stage failed; triggers compensation of the completed steps.
    SagaFailed {
        context: SagaContext,
        completed: Vec<String>,
        failed_step: String,
        reason: String,
    },

    /// Compensation finished (terminal).
    SagaCompensated {
        context: SagaContext,
        failed_step: String,
        reason: String,
        compensated: Vec<String>,
        compensation_errors: Vec<CompensationError>,
    },
}

impl SagaFlowEvent {
    /// Returns the event-type name used for bus subscriptions.
    pub fn event_type(&self) -> &'static str {
        match self {
            SagaFlowEvent::SagaStarted { .. } => "SagaStarted",
            SagaFlowEvent::OrderCreated { .. } => "OrderCreated",
            SagaFlowEvent::StockReserved { .. } => "StockReserved",
            SagaFlowEvent::PaymentProcessed { .. } => "PaymentProcessed",
            SagaFlowEvent::ShipmentCreated { .. } => "ShipmentCreated",
            SagaFlowEvent::SagaCompleted { .. } => "SagaCompleted",
            SagaFlowEvent::SagaFailed { .. } => "SagaFailed",
            SagaFlowEvent::SagaCompensated { .. } => "SagaCompensated",
        }
    }

    /// Splits a forward event into the context and completed list a
    /// stage handler works on. `None` for terminal and failure events.
    fn into_stage_input(self) -> Option<(SagaContext, Vec<String>)> {
        match self {
            SagaFlowEvent::SagaStarted { context } => Some((context, Vec::new())),
            SagaFlowEvent::OrderCreated { context, completed }
            | SagaFlowEvent::StockReserved { context, completed }
            | SagaFlowEvent::PaymentProcessed { context, completed }
            | SagaFlowEvent::ShipmentCreated { context, completed } => Some((context, completed)),
            _ => None,
        }
    }
}

/// Runs one step when its trigger event arrives, then publishes
/// either the stage's completion event or `SagaFailed`.
struct StageHandler {
    step: Arc<dyn SagaStep>,
    on_success: fn(SagaContext, Vec<String>) -> SagaFlowEvent,
}

#[async_trait]
impl EventHandler for StageHandler {
    async fn handle(&self, bus: &EventBus, event: SagaFlowEvent) -> Result<()> {
        let Some((mut ctx, mut completed)) = event.into_stage_input() else {
            return Err(SagaError::Choreography(format!(
                "stage '{}' received a non-stage event",
                self.step.name()
            )));
        };

        tracing::info!(step = self.step.name(), "choreography step started");
        match self.step.execute(&mut ctx).await {
            Ok(()) => {
                completed.push(self.step.name().to_string());
                bus.publish((self.on_success)(ctx, completed)).await
            }
            Err(e) => {
                tracing::warn!(step = self.step.name(), error = %e, "choreography step failed");
                bus.publish(SagaFlowEvent::SagaFailed {
                    failed_step: self.step.name().to_string(),
                    reason: e.to_string(),
                    context: ctx,
                    completed,
                })
                .await
            }
        }
    }
}

/// Announces `SagaCompleted` once the final stage's event arrives.
struct CompletionHandler;

#[async_trait]
impl EventHandler for CompletionHandler {
    async fn handle(&self, bus: &EventBus, event: SagaFlowEvent) -> Result<()> {
        let SagaFlowEvent::ShipmentCreated { context, completed } = event else {
            return Err(SagaError::Choreography(
                "completion handler received an unexpected event".to_string(),
            ));
        };
        bus.publish(SagaFlowEvent::SagaCompleted { context, completed })
            .await
    }
}

/// Compensates every completed step, in reverse completion order, when
/// `SagaFailed` arrives.
struct CompensationHandler {
    /// All steps in configured order, for lookup by name.
    steps: Vec<Arc<dyn SagaStep>>,
}

#[async_trait]
impl EventHandler for CompensationHandler {
    async fn handle(&self, bus: &EventBus, event: SagaFlowEvent) -> Result<()> {
        let SagaFlowEvent::SagaFailed {
            mut context,
            completed,
            failed_step,
            reason,
        } = event
        else {
            return Err(SagaError::Choreography(
                "compensation handler received an unexpected event".to_string(),
            ));
        };

        let mut compensated = Vec::with_capacity(completed.len());
        let mut compensation_errors = Vec::new();

        for name in completed.iter().rev() {
            let Some(step) = self.steps.iter().find(|s| s.name() == *name) else {
                tracing::warn!(step = %name, "no step registered for completed entry");
                continue;
            };
            match step.compensate(&mut context).await {
                Ok(()) => {
                    tracing::info!(step = %name, "compensation step completed");
                }
                Err(e) => {
                    tracing::warn!(step = %name, error = %e, "compensation step failed");
                    compensation_errors.push(CompensationError {
                        step: name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
            compensated.push(name.clone());
        }

        bus.publish(SagaFlowEvent::SagaCompensated {
            context,
            failed_step,
            reason,
            compensated,
            compensation_errors,
        })
        .await
    }
}

/// Resolves the pending run when a terminal event arrives.
struct TerminalHandler {
    pending: Arc<StdMutex<HashMap<RunId, oneshot::Sender<SagaResult>>>>,
}

#[async_trait]
impl EventHandler for TerminalHandler {
    async fn handle(&self, _bus: &EventBus, event: SagaFlowEvent) -> Result<()> {
        let result = match event {
            SagaFlowEvent::SagaCompleted { context, .. } => SagaResult::Completed { context },
            SagaFlowEvent::SagaCompensated {
                context,
                failed_step,
                reason,
                compensated,
                compensation_errors,
            } => SagaResult::Compensated {
                failed_step,
                reason,
                cancelled: false,
                compensated,
                compensation_errors,
                context,
            },
            _ => {
                return Err(SagaError::Choreography(
                    "terminal handler received an unexpected event".to_string(),
                ));
            }
        };

        let run_id = result.context().run_id();
        let sender = self.pending.lock().unwrap().remove(&run_id);
        match sender {
            Some(tx) => {
                if tx.send(result).is_err() {
                    tracing::warn!(%run_id, "run result receiver dropped");
                }
                Ok(())
            }
            None => Err(SagaError::Choreography(format!(
                "no pending run for {run_id}"
            ))),
        }
    }
}

/// Choreographed order-fulfillment saga.
///
/// Wires the four stages to the bus at construction time; `run`
/// publishes `SagaStarted` and returns once the cascade reaches a
/// terminal event. Results are equivalent to the orchestrated
/// topology's.
pub struct ChoreographySaga {
    bus: Arc<EventBus>,
    pending: Arc<StdMutex<HashMap<RunId, oneshot::Sender<SagaResult>>>>,
}

impl ChoreographySaga {
    /// Builds the bus and registers all stage, compensation and
    /// terminal handlers.
    pub fn new(
        create_order: Arc<dyn SagaStep>,
        reserve_stock: Arc<dyn SagaStep>,
        process_payment: Arc<dyn SagaStep>,
        create_shipment: Arc<dyn SagaStep>,
    ) -> Self {
        let bus = Arc::new(EventBus::new());
        let pending: Arc<StdMutex<HashMap<RunId, oneshot::Sender<SagaResult>>>> =
            Arc::new(StdMutex::new(HashMap::new()));

        bus.subscribe(
            "SagaStarted",
            Arc::new(StageHandler {
                step: create_order.clone(),
                on_success: |context, completed| SagaFlowEvent::OrderCreated { context, completed },
            }),
        );
        bus.subscribe(
            "OrderCreated",
            Arc::new(StageHandler {
                step: reserve_stock.clone(),
                on_success: |context, completed| SagaFlowEvent::StockReserved {
                    context,
                    completed,
                },
            }),
        );
        bus.subscribe(
            "StockReserved",
            Arc::new(StageHandler {
                step: process_payment.clone(),
                on_success: |context, completed| SagaFlowEvent::PaymentProcessed {
                    context,
                    completed,
                },
            }),
        );
        bus.subscribe(
            "PaymentProcessed",
            Arc::new(StageHandler {
                step: create_shipment.clone(),
                on_success: |context, completed| SagaFlowEvent::ShipmentCreated {
                    context,
                    completed,
                },
            }),
        );
        bus.subscribe("ShipmentCreated", Arc::new(CompletionHandler));
        bus.subscribe(
            "SagaFailed",
            Arc::new(CompensationHandler {
                steps: vec![create_order, reserve_stock, process_payment, create_shipment],
            }),
        );

        let terminal = Arc::new(TerminalHandler {
            pending: pending.clone(),
        });
        bus.subscribe("SagaCompleted", terminal.clone());
        bus.subscribe("SagaCompensated", terminal);

        Self { bus, pending }
    }

    /// Returns the underlying bus, e.g. to attach additional
    /// observers.
    pub fn bus(&self) -> Arc<EventBus> {
        self.bus.clone()
    }

    /// Runs the saga by publishing `SagaStarted` and awaiting the
    /// terminal event. Same precondition behavior as the
    /// orchestrator: a context without items fails fast.
    #[tracing::instrument(skip(self, ctx), fields(run_id = %ctx.run_id()))]
    pub async fn run(&self, ctx: SagaContext) -> Result<SagaResult> {
        if ctx.items().is_empty() {
            return Err(SagaError::InvalidContext("context has no items".to_string()));
        }

        let run_id = ctx.run_id();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(run_id, tx);

        let published = self
            .bus
            .publish(SagaFlowEvent::SagaStarted { context: ctx })
            .await;

        // The entire cascade runs within the publish call, so a
        // finished run has already taken its entry out of the map. An
        // entry still present means the cascade ended without a
        // terminal event; take it back out so the map does not
        // accumulate dead senders.
        let stale = self.pending.lock().unwrap().remove(&run_id);
        published?;
        if stale.is_some() {
            return Err(SagaError::Choreography(
                "run finished without a terminal event".to_string(),
            ));
        }

        rx.await
            .map_err(|_| SagaError::Choreography("run result sender dropped".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CustomerId, Money, OrderItem};

    #[test]
    fn test_event_type_names() {
        let ctx = SagaContext::new(CustomerId::new(), vec![]);
        assert_eq!(
            SagaFlowEvent::SagaStarted {
                context: ctx.clone()
            }
            .event_type(),
            "SagaStarted"
        );
        assert_eq!(
            SagaFlowEvent::OrderCreated {
                context: ctx.clone(),
                completed: vec![]
            }
            .event_type(),
            "OrderCreated"
        );
        assert_eq!(
            SagaFlowEvent::SagaFailed {
                context: ctx.clone(),
                completed: vec![],
                failed_step: "reserve_stock".to_string(),
                reason: "Insufficient stock".to_string(),
            }
            .event_type(),
            "SagaFailed"
        );
        assert_eq!(
            SagaFlowEvent::SagaCompensated {
                context: ctx,
                failed_step: "reserve_stock".to_string(),
                reason: "Insufficient stock".to_string(),
                compensated: vec![],
                compensation_errors: vec![],
            }
            .event_type(),
            "SagaCompensated"
        );
    }

    #[test]
    fn test_serialization_roundtrip() {
        let ctx = SagaContext::new(
            CustomerId::new(),
            vec![OrderItem::new("SKU-001", "Widget", 1, Money::from_cents(500))],
        );
        let event = SagaFlowEvent::StockReserved {
            context: ctx,
            completed: vec!["create_order".to_string(), "reserve_stock".to_string()],
        };

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: SagaFlowEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.event_type(), "StockReserved");
        let Some((_, completed)) = deserialized.into_stage_input() else {
            panic!("expected stage input");
        };
        assert_eq!(completed.len(), 2);
    }

    #[test]
    fn test_stage_input_for_started_event_is_empty() {
        let ctx = SagaContext::new(CustomerId::new(), vec![]);
        let (_, completed) = SagaFlowEvent::SagaStarted { context: ctx }
            .into_stage_input()
            .unwrap();
        assert!(completed.is_empty());
    }

    #[tokio::test]
    async fn test_run_without_terminal_event_leaves_no_pending_entry() {
        // A bus with no handlers never produces a terminal event; the
        // run must error and still clean its sender out of the map.
        let saga = ChoreographySaga {
            bus: Arc::new(EventBus::new()),
            pending: Arc::new(StdMutex::new(HashMap::new())),
        };
        let ctx = SagaContext::new(
            CustomerId::new(),
            vec![OrderItem::new("SKU-001", "Widget", 1, Money::from_cents(500))],
        );

        let result = saga.run(ctx).await;

        assert!(matches!(result, Err(SagaError::Choreography(_))));
        assert!(saga.pending.lock().unwrap().is_empty());
    }

    #[test]
    fn test_terminal_events_are_not_stage_input() {
        let ctx = SagaContext::new(CustomerId::new(), vec![]);
        assert!(
            SagaFlowEvent::SagaCompleted {
                context: ctx,
                completed: vec![]
            }
            .into_stage_input()
            .is_none()
        );
    }
}
