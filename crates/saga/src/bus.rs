//! In-process event bus for the choreography topology.
//!
//! Registration is a configuration-time operation; dispatch delivers
//! to a snapshot of the subscriber list taken at publish time, so
//! handlers registered mid-delivery never see the event that was
//! already in flight.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::choreography::SagaFlowEvent;
use crate::error::Result;

/// A subscriber reacting to published saga events.
///
/// Handlers receive the bus so they can publish follow-up events
/// without holding their own reference to it.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handles one delivered event.
    async fn handle(&self, bus: &EventBus, event: SagaFlowEvent) -> Result<()>;
}

struct Topic {
    handlers: Vec<Arc<dyn EventHandler>>,
    /// Serializes delivery for this event type; different types may
    /// deliver concurrently.
    delivery: Arc<Mutex<()>>,
}

impl Topic {
    fn new() -> Self {
        Self {
            handlers: Vec::new(),
            delivery: Arc::new(Mutex::new(())),
        }
    }
}

/// Pub/sub bus keyed by event-type name.
///
/// Handlers for a given event type are invoked sequentially in
/// subscription order; a handler failure is logged and does not
/// prevent delivery to subsequent handlers.
#[derive(Default)]
pub struct EventBus {
    topics: RwLock<HashMap<String, Topic>>,
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for the given event type.
    /// Configuration-time only.
    pub fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>) {
        let mut topics = self.topics.write().unwrap();
        topics
            .entry(event_type.to_string())
            .or_insert_with(Topic::new)
            .handlers
            .push(handler);
    }

    /// Returns the number of handlers subscribed to an event type.
    pub fn subscriber_count(&self, event_type: &str) -> usize {
        self.topics
            .read()
            .unwrap()
            .get(event_type)
            .map_or(0, |t| t.handlers.len())
    }

    /// Publishes an event, awaiting every handler for its type in
    /// subscription order. Publishing a type with no subscribers is a
    /// no-op.
    pub async fn publish(&self, event: SagaFlowEvent) -> Result<()> {
        let event_type = event.event_type();

        let (handlers, delivery) = {
            let topics = self.topics.read().unwrap();
            match topics.get(event_type) {
                // Snapshot taken under the lock, released before dispatch
                Some(topic) => (topic.handlers.clone(), topic.delivery.clone()),
                None => return Ok(()),
            }
        };

        let _guard = delivery.lock().await;
        for handler in handlers {
            if let Err(e) = handler.handle(self, event.clone()).await {
                tracing::warn!(event_type, error = %e, "event handler failed");
            }
        }

        Ok(())
    }
}
