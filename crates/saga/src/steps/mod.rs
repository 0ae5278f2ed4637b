//! Concrete saga steps for order fulfillment.
//!
//! Each step owns exactly one side effect and its compensating
//! action, performed through one injected service trait.

pub mod create_order;
pub mod create_shipment;
pub mod process_payment;
pub mod reserve_stock;

pub use create_order::CreateOrderStep;
pub use create_shipment::CreateShipmentStep;
pub use process_payment::ProcessPaymentStep;
pub use reserve_stock::ReserveStockStep;
