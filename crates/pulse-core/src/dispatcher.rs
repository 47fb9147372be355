//! EventDispatcher — background consumer loop.
//!
//! Polls the durable log for `new` events and hands them to in-process
//! consumers registered per event name. Only events that a registered
//! consumer handled are advanced to `processed`; everything else keeps its
//! status so an external consumer can still pick it up.

use async_trait::async_trait;
use pulse_store::{Event, EventStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// An in-process event consumer.
#[async_trait]
pub trait EventConsumer: Send + Sync {
    /// Consumer name (for logging)
    fn name(&self) -> &str;

    /// Handle one event. Errors are logged and never stop the dispatcher.
    async fn handle(&self, event: &Event) -> anyhow::Result<()>;
}

/// Background dispatcher advancing `new` events through registered consumers.
pub struct EventDispatcher {
    store: Arc<EventStore>,
    consumers: RwLock<HashMap<String, Vec<Arc<dyn EventConsumer>>>>,
    poll_interval: Duration,
    batch_limit: i64,
}

impl EventDispatcher {
    /// Create a dispatcher over the given store.
    #[must_use]
    pub fn new(store: Arc<EventStore>, poll_interval: Duration) -> Self {
        Self {
            store,
            consumers: RwLock::new(HashMap::new()),
            poll_interval,
            batch_limit: 100,
        }
    }

    /// Register a consumer for one event name.
    pub async fn register(&self, event_name: &str, consumer: Arc<dyn EventConsumer>) {
        self.consumers
            .write()
            .await
            .entry(event_name.to_string())
            .or_default()
            .push(consumer);
    }

    /// One poll cycle: fetch `new` events, run matching consumers, and mark
    /// consumed events `processed`. Returns how many events were consumed.
    pub async fn poll_once(&self) -> pulse_store::Result<usize> {
        let events = self.store.list_unprocessed(self.batch_limit).await?;
        if events.is_empty() {
            return Ok(0);
        }

        let mut consumed = 0;
        for event in events {
            let handlers = {
                let consumers = self.consumers.read().await;
                consumers.get(&event.event_name).cloned()
            };
            let Some(handlers) = handlers else { continue };
            if handlers.is_empty() {
                continue;
            }

            for consumer in &handlers {
                if let Err(e) = consumer.handle(&event).await {
                    error!(
                        "Consumer '{}' failed on event {}: {}",
                        consumer.name(),
                        event.id,
                        e
                    );
                }
            }
            self.store.mark_processed(event.id).await?;
            debug!("Event {} ('{}') processed", event.id, event.event_name);
            consumed += 1;
        }
        Ok(consumed)
    }

    /// Spawn the polling loop. Runs until the token is cancelled.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Event dispatcher started (poll interval {:?})",
                self.poll_interval
            );
            let mut ticker = tokio::time::interval(self.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.poll_once().await {
                            error!("Event dispatcher poll failed: {}", e);
                        }
                    }
                }
            }
            info!("Event dispatcher stopped");
        })
    }
}
