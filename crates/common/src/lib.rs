//! Shared value objects used across the saga engine.
//!
//! Identifiers are UUID newtypes to prevent mixing up a saga run ID
//! with an order or customer ID at compile time. Monetary amounts are
//! integer cents to avoid floating point issues.

pub mod order;
pub mod types;

pub use order::{Money, OrderItem, ProductId};
pub use types::{CustomerId, OrderId, RunId};
