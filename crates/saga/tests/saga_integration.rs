//! Integration tests for the saga engine, orchestration and
//! choreography topologies alike.

use std::sync::Arc;

use async_trait::async_trait;
use common::{CustomerId, Money, OrderItem};
use saga::{
    CancelFlag, ChoreographySaga, CreateOrderStep, CreateShipmentStep, InMemoryOrderStore,
    InMemoryPaymentGateway, InMemoryShipmentService, InMemoryStockService, ProcessPaymentStep,
    ReserveStockStep, SagaContext, SagaError, SagaOrchestrator, SagaResult, SagaStep,
};

struct TestHarness {
    saga: SagaOrchestrator,
    orders: InMemoryOrderStore,
    stock: InMemoryStockService,
    payment: InMemoryPaymentGateway,
    shipping: InMemoryShipmentService,
}

impl TestHarness {
    fn new() -> Self {
        let orders = InMemoryOrderStore::new();
        let stock = InMemoryStockService::new();
        let payment = InMemoryPaymentGateway::new();
        let shipping = InMemoryShipmentService::new();

        let mut saga = SagaOrchestrator::new();
        saga.add_step(Arc::new(CreateOrderStep::new(orders.clone())));
        saga.add_step(Arc::new(ReserveStockStep::new(stock.clone())));
        saga.add_step(Arc::new(ProcessPaymentStep::new(payment.clone())));
        saga.add_step(Arc::new(CreateShipmentStep::new(shipping.clone())));

        Self {
            saga,
            orders,
            stock,
            payment,
            shipping,
        }
    }

    fn context(&self) -> SagaContext {
        SagaContext::new(
            CustomerId::new(),
            vec![
                OrderItem::new("SKU-001", "Widget", 2, Money::from_cents(1000)),
                OrderItem::new("SKU-002", "Gadget", 1, Money::from_cents(2500)),
            ],
        )
    }
}

#[tokio::test]
async fn test_happy_path_full_order_fulfillment() {
    let h = TestHarness::new();

    let result = h.saga.run(h.context()).await.unwrap();

    assert!(result.is_success());
    let ctx = result.context();
    assert!(ctx.order_created());
    assert!(ctx.stock_reserved());
    assert!(ctx.payment_processed());
    assert!(ctx.shipment_created());
    assert!(ctx.tracking_number().is_some_and(|t| !t.is_empty()));

    assert_eq!(h.orders.open_order_count(), 1);
    assert_eq!(h.stock.reservation_count(), 1);
    assert_eq!(h.payment.payment_count(), 1);
    assert_eq!(h.shipping.shipment_count(), 1);
}

#[tokio::test]
async fn test_stock_failure_cancels_order_and_stops_there() {
    let h = TestHarness::new();
    h.stock.set_fail_on_reserve(true);

    let result = h.saga.run(h.context()).await.unwrap();

    assert_eq!(result.failed_step(), Some("reserve_stock"));
    assert!(result.fully_compensated());

    let SagaResult::Compensated { compensated, .. } = &result else {
        panic!("expected compensated result");
    };
    assert_eq!(compensated, &["create_order"]);

    // Order cancelled rather than deleted; later services never touched
    assert_eq!(h.orders.order_count(), 1);
    assert_eq!(h.orders.open_order_count(), 0);
    assert!(h.orders.is_cancelled(result.context().order_id().unwrap()));
    assert_eq!(h.payment.payment_count(), 0);
    assert_eq!(h.shipping.shipment_count(), 0);
}

#[tokio::test]
async fn test_payment_failure_compensates_in_reverse_order() {
    let h = TestHarness::new();
    h.payment.set_fail_on_charge(true);

    let result = h.saga.run(h.context()).await.unwrap();

    assert_eq!(result.failed_step(), Some("process_payment"));

    let SagaResult::Compensated { compensated, .. } = &result else {
        panic!("expected compensated result");
    };
    assert_eq!(compensated, &["reserve_stock", "create_order"]);

    assert_eq!(h.stock.reservation_count(), 0);
    assert_eq!(h.orders.open_order_count(), 0);
    assert_eq!(h.shipping.shipment_count(), 0);

    let ctx = result.context();
    assert!(!ctx.order_created());
    assert!(!ctx.stock_reserved());
    assert!(!ctx.payment_processed());
}

#[tokio::test]
async fn test_shipping_failure_unwinds_everything() {
    let h = TestHarness::new();
    h.shipping.set_fail_on_create(true);

    let result = h.saga.run(h.context()).await.unwrap();

    assert_eq!(result.failed_step(), Some("create_shipment"));

    let SagaResult::Compensated { compensated, .. } = &result else {
        panic!("expected compensated result");
    };
    assert_eq!(
        compensated,
        &["process_payment", "reserve_stock", "create_order"]
    );

    assert_eq!(h.stock.reservation_count(), 0);
    assert_eq!(h.payment.payment_count(), 0);
    assert_eq!(h.orders.open_order_count(), 0);
    assert_eq!(h.shipping.shipment_count(), 0);
}

#[tokio::test]
async fn test_compensation_failure_is_reported_not_hidden() {
    let h = TestHarness::new();
    h.shipping.set_fail_on_create(true);
    h.payment.set_fail_on_refund(true);

    let result = h.saga.run(h.context()).await.unwrap();

    assert_eq!(result.failed_step(), Some("create_shipment"));
    assert!(!result.fully_compensated());

    // The refund failed but the sweep still reached the earlier steps
    let SagaResult::Compensated {
        compensated,
        compensation_errors,
        ..
    } = &result
    else {
        panic!("expected compensated result");
    };
    assert_eq!(
        compensated,
        &["process_payment", "reserve_stock", "create_order"]
    );
    assert_eq!(compensation_errors.len(), 1);
    assert_eq!(compensation_errors[0].step, "process_payment");

    // The payment stands: a resource needing operator attention
    assert_eq!(h.payment.payment_count(), 1);
    assert_eq!(h.stock.reservation_count(), 0);
    assert_eq!(h.orders.open_order_count(), 0);
}

/// Delegating step that requests cancellation after it completes, so
/// the run is cancelled at the next step boundary.
struct CancelAfter {
    inner: Arc<dyn SagaStep>,
    flag: CancelFlag,
}

#[async_trait]
impl SagaStep for CancelAfter {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn execute(&self, ctx: &mut SagaContext) -> Result<(), SagaError> {
        self.inner.execute(ctx).await?;
        self.flag.cancel();
        Ok(())
    }

    async fn compensate(&self, ctx: &mut SagaContext) -> Result<(), SagaError> {
        self.inner.compensate(ctx).await
    }
}

#[tokio::test]
async fn test_cancellation_between_steps_compensates_completed_steps() {
    let orders = InMemoryOrderStore::new();
    let stock = InMemoryStockService::new();
    let payment = InMemoryPaymentGateway::new();
    let shipping = InMemoryShipmentService::new();
    let flag = CancelFlag::new();

    let mut saga = SagaOrchestrator::new();
    saga.add_step(Arc::new(CreateOrderStep::new(orders.clone())));
    saga.add_step(Arc::new(CancelAfter {
        inner: Arc::new(ReserveStockStep::new(stock.clone())),
        flag: flag.clone(),
    }));
    saga.add_step(Arc::new(ProcessPaymentStep::new(payment.clone())));
    saga.add_step(Arc::new(CreateShipmentStep::new(shipping.clone())));

    let ctx = SagaContext::new(
        CustomerId::new(),
        vec![OrderItem::new("SKU-001", "Widget", 1, Money::from_cents(1000))],
    );
    let result = saga.run_cancellable(ctx, &flag).await.unwrap();

    assert!(result.is_cancelled());
    // Cancelled before payment ran
    assert_eq!(result.failed_step(), Some("process_payment"));
    assert_eq!(h_compensated(&result), &["reserve_stock", "create_order"]);
    assert_eq!(stock.reservation_count(), 0);
    assert_eq!(orders.open_order_count(), 0);
    assert_eq!(payment.payment_count(), 0);
    assert_eq!(shipping.shipment_count(), 0);
}

fn h_compensated(result: &SagaResult) -> &[String] {
    match result {
        SagaResult::Compensated { compensated, .. } => compensated,
        SagaResult::Completed { .. } => panic!("expected compensated result"),
    }
}

#[tokio::test]
async fn test_orchestrator_is_reusable_across_runs() {
    let h = TestHarness::new();

    let first = h.saga.run(h.context()).await.unwrap();
    let second = h.saga.run(h.context()).await.unwrap();

    assert!(first.is_success());
    assert!(second.is_success());
    assert_ne!(
        first.context().run_id(),
        second.context().run_id(),
        "each run gets a fresh context"
    );
    assert_eq!(h.orders.open_order_count(), 2);
    assert_eq!(h.shipping.shipment_count(), 2);
}

#[tokio::test]
async fn test_concurrent_runs_do_not_interfere() {
    let h = Arc::new(TestHarness::new());

    let (r1, r2) = tokio::join!(
        {
            let h = h.clone();
            let ctx = h.context();
            async move { h.saga.run(ctx).await }
        },
        {
            let h = h.clone();
            let ctx = h.context();
            async move { h.saga.run(ctx).await }
        }
    );

    let r1 = r1.unwrap();
    let r2 = r2.unwrap();
    assert!(r1.is_success());
    assert!(r2.is_success());
    assert_ne!(r1.context().order_id(), r2.context().order_id());
    assert_eq!(h.orders.open_order_count(), 2);
    assert_eq!(h.stock.reservation_count(), 2);
    assert_eq!(h.payment.payment_count(), 2);
}

#[tokio::test]
async fn test_run_without_steps_fails_fast() {
    let saga = SagaOrchestrator::new();
    let ctx = SagaContext::new(
        CustomerId::new(),
        vec![OrderItem::new("SKU-001", "Widget", 1, Money::from_cents(500))],
    );

    let result = saga.run(ctx).await;
    assert!(matches!(result, Err(SagaError::NoStepsConfigured)));
}

#[tokio::test]
async fn test_run_with_empty_context_fails_fast() {
    let h = TestHarness::new();
    let ctx = SagaContext::new(CustomerId::new(), vec![]);

    let result = h.saga.run(ctx).await;
    assert!(matches!(result, Err(SagaError::InvalidContext(_))));
    assert_eq!(h.orders.order_count(), 0);
}

// Choreography topology

struct ChoreographyHarness {
    saga: ChoreographySaga,
    orders: InMemoryOrderStore,
    stock: InMemoryStockService,
    payment: InMemoryPaymentGateway,
    shipping: InMemoryShipmentService,
}

impl ChoreographyHarness {
    fn new() -> Self {
        let orders = InMemoryOrderStore::new();
        let stock = InMemoryStockService::new();
        let payment = InMemoryPaymentGateway::new();
        let shipping = InMemoryShipmentService::new();

        let saga = ChoreographySaga::new(
            Arc::new(CreateOrderStep::new(orders.clone())),
            Arc::new(ReserveStockStep::new(stock.clone())),
            Arc::new(ProcessPaymentStep::new(payment.clone())),
            Arc::new(CreateShipmentStep::new(shipping.clone())),
        );

        Self {
            saga,
            orders,
            stock,
            payment,
            shipping,
        }
    }

    fn context(&self) -> SagaContext {
        SagaContext::new(
            CustomerId::new(),
            vec![OrderItem::new("SKU-001", "Widget", 2, Money::from_cents(1000))],
        )
    }
}

#[tokio::test]
async fn test_choreography_happy_path() {
    let h = ChoreographyHarness::new();

    let result = h.saga.run(h.context()).await.unwrap();

    assert!(result.is_success());
    let ctx = result.context();
    assert!(ctx.order_created());
    assert!(ctx.stock_reserved());
    assert!(ctx.payment_processed());
    assert!(ctx.shipment_created());

    assert_eq!(h.orders.open_order_count(), 1);
    assert_eq!(h.shipping.shipment_count(), 1);
}

#[tokio::test]
async fn test_choreography_stock_failure_compensates_order() {
    let h = ChoreographyHarness::new();
    h.stock.set_fail_on_reserve(true);

    let result = h.saga.run(h.context()).await.unwrap();

    assert_eq!(result.failed_step(), Some("reserve_stock"));
    assert_eq!(h_compensated(&result), &["create_order"]);
    assert!(result.fully_compensated());

    assert_eq!(h.orders.open_order_count(), 0);
    assert_eq!(h.payment.payment_count(), 0);
    assert_eq!(h.shipping.shipment_count(), 0);
}

#[tokio::test]
async fn test_choreography_payment_failure_reverse_order() {
    let h = ChoreographyHarness::new();
    h.payment.set_fail_on_charge(true);

    let result = h.saga.run(h.context()).await.unwrap();

    assert_eq!(result.failed_step(), Some("process_payment"));
    assert_eq!(h_compensated(&result), &["reserve_stock", "create_order"]);

    assert_eq!(h.stock.reservation_count(), 0);
    assert_eq!(h.orders.open_order_count(), 0);
}

#[tokio::test]
async fn test_choreography_compensation_failure_is_reported() {
    let h = ChoreographyHarness::new();
    h.shipping.set_fail_on_create(true);
    h.payment.set_fail_on_refund(true);

    let result = h.saga.run(h.context()).await.unwrap();

    assert!(!result.fully_compensated());
    assert_eq!(result.compensation_errors().len(), 1);
    assert_eq!(result.compensation_errors()[0].step, "process_payment");
    assert_eq!(
        h_compensated(&result),
        &["process_payment", "reserve_stock", "create_order"]
    );
    assert_eq!(h.payment.payment_count(), 1);
}

#[tokio::test]
async fn test_choreography_rejects_empty_context() {
    let h = ChoreographyHarness::new();
    let ctx = SagaContext::new(CustomerId::new(), vec![]);

    let result = h.saga.run(ctx).await;
    assert!(matches!(result, Err(SagaError::InvalidContext(_))));
}
