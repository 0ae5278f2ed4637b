//! Resource traits and in-memory implementations for saga steps.
//!
//! Each trait is one external collaborator a step performs its side
//! effect through. The in-memory implementations double as test seams
//! via their `set_fail_on_*` switches.

pub mod order;
pub mod payment;
pub mod shipping;
pub mod stock;

pub use order::{InMemoryOrderStore, OrderStore};
pub use payment::{ChargeResult, InMemoryPaymentGateway, PaymentGateway};
pub use shipping::{InMemoryShipmentService, ShipmentResult, ShipmentService};
pub use stock::{InMemoryStockService, ReservationResult, StockService};
