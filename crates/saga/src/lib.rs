//! Saga pattern engine for multi-step transactions with compensation.
//!
//! A saga is an ordered sequence of steps across independent resources
//! (order store, stock, payment, shipping). If any step fails partway
//! through, previously completed steps are undone via compensating
//! actions, in reverse order.
//!
//! Two execution topologies are provided:
//! - [`SagaOrchestrator`]: a central coordinator sequencing the steps.
//! - [`ChoreographySaga`]: independent handlers reacting to events on
//!   an in-process [`EventBus`].

pub mod bus;
pub mod choreography;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod result;
pub mod services;
pub mod state;
pub mod step;
pub mod steps;

pub use bus::{EventBus, EventHandler};
pub use choreography::{ChoreographySaga, SagaFlowEvent};
pub use context::SagaContext;
pub use error::SagaError;
pub use orchestrator::{CancelFlag, SagaOrchestrator};
pub use result::{CompensationError, SagaResult};
pub use services::{
    ChargeResult, InMemoryOrderStore, InMemoryPaymentGateway, InMemoryShipmentService,
    InMemoryStockService, OrderStore, PaymentGateway, ReservationResult, ShipmentResult,
    ShipmentService, StockService,
};
pub use state::SagaState;
pub use step::SagaStep;
pub use steps::{CreateOrderStep, CreateShipmentStep, ProcessPaymentStep, ReserveStockStep};
