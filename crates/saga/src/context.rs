//! Mutable per-run saga context.

use chrono::{DateTime, Utc};
use common::{CustomerId, Money, OrderId, OrderItem, RunId};
use serde::{Deserialize, Serialize};

/// The accumulating state of one saga run.
///
/// A fresh context is created per run and handed exclusively to the
/// executing topology (orchestrator or choreography handlers); each
/// step mutates it through the `record_*`/`clear_*` methods and never
/// retains a reference past its own call.
///
/// Effect flags are set only by the step that owns the side effect,
/// and only after the forward action succeeded; a successful
/// compensation clears the flag again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaContext {
    run_id: RunId,
    started_at: DateTime<Utc>,
    customer_id: CustomerId,
    items: Vec<OrderItem>,
    total: Money,

    order_id: Option<OrderId>,
    reservation_id: Option<String>,
    payment_id: Option<String>,
    tracking_number: Option<String>,

    order_created: bool,
    stock_reserved: bool,
    payment_processed: bool,
    shipment_created: bool,
}

impl SagaContext {
    /// Creates a fresh context for one run. The order total is
    /// computed from the items.
    pub fn new(customer_id: CustomerId, items: Vec<OrderItem>) -> Self {
        let total = items
            .iter()
            .fold(Money::zero(), |acc, item| acc + item.total_price());
        Self {
            run_id: RunId::new(),
            started_at: Utc::now(),
            customer_id,
            items,
            total,
            order_id: None,
            reservation_id: None,
            payment_id: None,
            tracking_number: None,
            order_created: false,
            stock_reserved: false,
            payment_processed: false,
            shipment_created: false,
        }
    }

    /// Returns the unique run ID.
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Returns when the run started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns the customer placing the order.
    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    /// Returns the ordered items.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Returns the order total computed from the items.
    pub fn total(&self) -> Money {
        self.total
    }

    /// Returns the order ID, once the order has been created.
    pub fn order_id(&self) -> Option<OrderId> {
        self.order_id
    }

    /// Returns the stock reservation ID, if set.
    pub fn reservation_id(&self) -> Option<&str> {
        self.reservation_id.as_deref()
    }

    /// Returns the payment ID, if set.
    pub fn payment_id(&self) -> Option<&str> {
        self.payment_id.as_deref()
    }

    /// Returns the shipment tracking number, if set.
    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    /// True once the order has been created and not cancelled.
    pub fn order_created(&self) -> bool {
        self.order_created
    }

    /// True while a stock reservation is held.
    pub fn stock_reserved(&self) -> bool {
        self.stock_reserved
    }

    /// True while a payment charge stands.
    pub fn payment_processed(&self) -> bool {
        self.payment_processed
    }

    /// True while a shipment exists.
    pub fn shipment_created(&self) -> bool {
        self.shipment_created
    }

    /// Records a successfully created order.
    pub fn record_order(&mut self, order_id: OrderId) {
        self.order_id = Some(order_id);
        self.order_created = true;
    }

    /// Clears the order flag after the order was cancelled. The order
    /// ID is kept for reporting.
    pub fn clear_order(&mut self) {
        self.order_created = false;
    }

    /// Records a successful stock reservation.
    pub fn record_reservation(&mut self, reservation_id: String) {
        self.reservation_id = Some(reservation_id);
        self.stock_reserved = true;
    }

    /// Clears the reservation after it was released.
    pub fn clear_reservation(&mut self) {
        self.reservation_id = None;
        self.stock_reserved = false;
    }

    /// Records a successful payment charge.
    pub fn record_payment(&mut self, payment_id: String) {
        self.payment_id = Some(payment_id);
        self.payment_processed = true;
    }

    /// Clears the payment after it was refunded.
    pub fn clear_payment(&mut self) {
        self.payment_id = None;
        self.payment_processed = false;
    }

    /// Records a successfully created shipment.
    pub fn record_shipment(&mut self, tracking_number: String) {
        self.tracking_number = Some(tracking_number);
        self.shipment_created = true;
    }

    /// Clears the shipment after it was cancelled.
    pub fn clear_shipment(&mut self) {
        self.tracking_number = None;
        self.shipment_created = false;
    }
}
