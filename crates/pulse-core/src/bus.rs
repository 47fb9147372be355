//! EventBus — the publish pipeline.
//!
//! Validates an incoming event, records it durably, then fans it out to
//! every live connection interested in the event name. Durability precedes
//! delivery: a subscriber never sees an event that is not yet recorded.
//! Delivery failures are isolated per connection and never fail a publish.

use crate::error::{Error, Result};
use crate::registry::SubscriptionRegistry;
use pulse_store::{Event, EventStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Frame pushed to a live subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFrame {
    /// Name of the published event
    pub event_name: String,
    /// Opaque structured payload, passed through unvalidated
    pub payload: serde_json::Value,
}

/// Publish pipeline: validate → durable append → best-effort fan-out.
pub struct EventBus {
    store: Arc<EventStore>,
    registry: Arc<SubscriptionRegistry>,
    delivery_timeout: Duration,
}

impl EventBus {
    /// Default bound on a single connection's outbound enqueue.
    pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

    /// Create a bus over the given store and registry.
    #[must_use]
    pub fn new(store: Arc<EventStore>, registry: Arc<SubscriptionRegistry>) -> Self {
        Self {
            store,
            registry,
            delivery_timeout: Self::DEFAULT_DELIVERY_TIMEOUT,
        }
    }

    /// Override the per-connection delivery timeout.
    #[must_use]
    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// The durable log this bus appends to.
    #[must_use]
    pub fn store(&self) -> &Arc<EventStore> {
        &self.store
    }

    /// The registry this bus fans out through.
    #[must_use]
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Publish an event: validate, durably append, then fan out.
    ///
    /// Fails with `Validation` on an empty `event_name` and `Persistence`
    /// when the append fails — in which case no delivery is attempted. A
    /// per-connection delivery failure deregisters the offending connection
    /// and is logged; the caller is still told the event was recorded.
    pub async fn publish(
        &self,
        event_name: &str,
        payload: serde_json::Value,
        source: &str,
    ) -> Result<Event> {
        if event_name.trim().is_empty() {
            return Err(Error::Validation("event_name must not be empty".to_string()));
        }

        let event = self.store.append(event_name, &payload, source).await?;
        let delivered = self.fan_out(&event).await;
        debug!(
            "Published event {} ('{}') to {} subscriber(s)",
            event.id, event.event_name, delivered
        );
        Ok(event)
    }

    /// Fan the event out to every matched connection.
    ///
    /// One task per connection so a slow subscriber only delays itself;
    /// each enqueue is bounded by the delivery timeout. Returns how many
    /// connections accepted the frame.
    async fn fan_out(&self, event: &Event) -> usize {
        let targets = self.registry.matched(&event.event_name).await;
        if targets.is_empty() {
            return 0;
        }

        let frame = EventFrame {
            event_name: event.event_name.clone(),
            payload: event.payload.clone(),
        };

        let mut handles = Vec::with_capacity(targets.len());
        for (connection_id, outbound) in targets {
            let frame = frame.clone();
            let registry = Arc::clone(&self.registry);
            let timeout = self.delivery_timeout;
            handles.push(tokio::spawn(async move {
                let sent = match tokio::time::timeout(timeout, outbound.send(frame)).await {
                    Ok(Ok(())) => true,
                    Ok(Err(_)) => {
                        let err = Error::Delivery {
                            connection_id,
                            reason: "outbound channel closed".to_string(),
                        };
                        warn!("{}; dropping connection", err);
                        false
                    }
                    Err(_) => {
                        let err = Error::Delivery {
                            connection_id,
                            reason: format!("write stalled for {:?}", timeout),
                        };
                        warn!("{}; dropping connection", err);
                        false
                    }
                };
                if !sent {
                    registry.deregister(connection_id).await;
                }
                sent
            }));
        }

        let mut delivered = 0;
        for handle in handles {
            if matches!(handle.await, Ok(true)) {
                delivered += 1;
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_store::EventStatus;
    use serde_json::json;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    async fn test_bus() -> (EventBus, Arc<SubscriptionRegistry>) {
        let store = Arc::new(EventStore::in_memory().await.unwrap());
        let registry = Arc::new(SubscriptionRegistry::new());
        let bus = EventBus::new(store, Arc::clone(&registry))
            .with_delivery_timeout(Duration::from_millis(100));
        (bus, registry)
    }

    #[tokio::test]
    async fn test_publish_rejects_empty_name() {
        let (bus, _registry) = test_bus().await;
        let err = bus.publish("", json!({}), "test").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        // Nothing was recorded
        assert_eq!(bus.store().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_publish_records_before_delivery() {
        let (bus, registry) = test_bus().await;
        let id = Uuid::new_v4();
        let (tx, mut rx) = mpsc::channel(8);
        registry.register(id, tx).await;
        registry.subscribe(id, "user.created").await;

        let event = bus
            .publish("user.created", json!({"user_id": "123"}), "api")
            .await
            .unwrap();

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.event_name, "user.created");
        assert_eq!(frame.payload, json!({"user_id": "123"}));

        // The frame the subscriber saw is already durable
        let stored = bus.store().list(None).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, event.id);
        assert_eq!(stored[0].status, EventStatus::New);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_succeeds() {
        let (bus, _registry) = test_bus().await;
        let event = bus.publish("user.created", json!({}), "api").await.unwrap();
        assert_eq!(event.status, EventStatus::New);
        assert_eq!(bus.store().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_only_matching_subscribers_receive() {
        let (bus, registry) = test_bus().await;

        let interested = Uuid::new_v4();
        let (tx1, mut rx1) = mpsc::channel(8);
        registry.register(interested, tx1).await;
        registry.subscribe(interested, "order.shipped").await;

        let bystander = Uuid::new_v4();
        let (tx2, mut rx2) = mpsc::channel(8);
        registry.register(bystander, tx2).await;
        registry.subscribe(bystander, "order.paid").await;

        bus.publish("order.shipped", json!({"order": 1}), "api")
            .await
            .unwrap();

        let frame = rx1.recv().await.unwrap();
        assert_eq!(frame.event_name, "order.shipped");
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_connection_is_dropped_and_isolated() {
        let (bus, registry) = test_bus().await;

        let dead = Uuid::new_v4();
        let (dead_tx, dead_rx) = mpsc::channel(8);
        registry.register(dead, dead_tx).await;
        registry.subscribe(dead, "tick").await;
        drop(dead_rx); // connection's write loop is gone

        let alive = Uuid::new_v4();
        let (alive_tx, mut alive_rx) = mpsc::channel(8);
        registry.register(alive, alive_tx).await;
        registry.subscribe(alive, "tick").await;

        // Publish succeeds; the sibling still gets its copy
        let event = bus.publish("tick", json!({}), "system").await.unwrap();
        assert!(event.id > 0);
        assert!(alive_rx.recv().await.is_some());

        // The dead connection was deregistered
        assert!(registry.interests_of(dead).await.is_none());
        assert_eq!(registry.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_stalled_connection_is_dropped_after_timeout() {
        let (bus, registry) = test_bus().await;

        let stalled = Uuid::new_v4();
        let (stalled_tx, _stalled_rx) = mpsc::channel(1);
        // Fill the bounded channel so the next send blocks
        stalled_tx
            .send(EventFrame {
                event_name: "tick".to_string(),
                payload: json!({}),
            })
            .await
            .unwrap();
        registry.register(stalled, stalled_tx).await;
        registry.subscribe(stalled, "tick").await;

        let alive = Uuid::new_v4();
        let (alive_tx, mut alive_rx) = mpsc::channel(8);
        registry.register(alive, alive_tx).await;
        registry.subscribe(alive, "tick").await;

        bus.publish("tick", json!({}), "system").await.unwrap();

        assert!(alive_rx.recv().await.is_some());
        assert!(registry.interests_of(stalled).await.is_none());
    }

    #[tokio::test]
    async fn test_sequential_publishes_arrive_in_order() {
        let (bus, registry) = test_bus().await;
        let id = Uuid::new_v4();
        let (tx, mut rx) = mpsc::channel(8);
        registry.register(id, tx).await;
        registry.subscribe(id, "tick").await;

        bus.publish("tick", json!({"n": 1}), "system").await.unwrap();
        bus.publish("tick", json!({"n": 2}), "system").await.unwrap();

        assert_eq!(rx.recv().await.unwrap().payload, json!({"n": 1}));
        assert_eq!(rx.recv().await.unwrap().payload, json!({"n": 2}));
    }
}
