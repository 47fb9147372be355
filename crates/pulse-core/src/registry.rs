//! Subscription Registry — live connections and their interest sets.
//!
//! Subscriptions are ephemeral and in-memory only: they are created when a
//! connection is accepted, mutated by its control frames in order, and
//! destroyed atomically when the connection closes. All mutations happen
//! under a `tokio::sync::RwLock` scoped to the registry; the lock is never
//! held across a channel send or a socket write.

use crate::bus::EventFrame;
use std::collections::{HashMap, HashSet};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

/// One live streaming connection.
struct Connection {
    /// Event names this connection wants to receive
    interests: HashSet<String>,
    /// Bounded outbound channel drained by the gateway's write loop
    outbound: mpsc::Sender<EventFrame>,
}

/// In-memory map of live connections to interest sets.
#[derive(Default)]
pub struct SubscriptionRegistry {
    connections: RwLock<HashMap<Uuid, Connection>>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty interest set for a new connection.
    ///
    /// Idempotent: a second call for the same id is a no-op and keeps the
    /// first entry in place.
    pub async fn register(&self, connection_id: Uuid, outbound: mpsc::Sender<EventFrame>) {
        let mut connections = self.connections.write().await;
        if connections.contains_key(&connection_id) {
            warn!("Connection {} already registered, ignoring", connection_id);
            return;
        }
        connections.insert(
            connection_id,
            Connection {
                interests: HashSet::new(),
                outbound,
            },
        );
        debug!("Registered connection {}", connection_id);
    }

    /// Add `event_name` to a connection's interest set.
    ///
    /// An unknown connection id (a race with disconnection) is logged and
    /// ignored so the gateway never crashes on it. Returns whether the
    /// subscription was recorded.
    pub async fn subscribe(&self, connection_id: Uuid, event_name: &str) -> bool {
        let mut connections = self.connections.write().await;
        match connections.get_mut(&connection_id) {
            Some(conn) => {
                conn.interests.insert(event_name.to_string());
                debug!("Connection {} subscribed to '{}'", connection_id, event_name);
                true
            }
            None => {
                warn!(
                    "Subscribe to '{}' for unknown connection {}, ignoring",
                    event_name, connection_id
                );
                false
            }
        }
    }

    /// Remove `event_name` from a connection's interest set. No-op if the
    /// name (or the connection) is absent.
    pub async fn unsubscribe(&self, connection_id: Uuid, event_name: &str) -> bool {
        let mut connections = self.connections.write().await;
        match connections.get_mut(&connection_id) {
            Some(conn) => {
                let removed = conn.interests.remove(event_name);
                if removed {
                    debug!(
                        "Connection {} unsubscribed from '{}'",
                        connection_id, event_name
                    );
                }
                removed
            }
            None => false,
        }
    }

    /// Remove the connection and its whole interest set.
    ///
    /// Idempotent: the fan-out failure path and the gateway close path may
    /// both reach this for the same connection.
    pub async fn deregister(&self, connection_id: Uuid) -> bool {
        let removed = self
            .connections
            .write()
            .await
            .remove(&connection_id)
            .is_some();
        if removed {
            debug!("Deregistered connection {}", connection_id);
        }
        removed
    }

    /// Snapshot of every connection currently interested in `event_name`.
    ///
    /// Reflects registry state at call time; control frames racing with a
    /// publish may or may not be included.
    pub async fn matched(&self, event_name: &str) -> Vec<(Uuid, mpsc::Sender<EventFrame>)> {
        let connections = self.connections.read().await;
        connections
            .iter()
            .filter(|(_, conn)| conn.interests.contains(event_name))
            .map(|(id, conn)| (*id, conn.outbound.clone()))
            .collect()
    }

    /// Number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Current interest set of a connection, if it is still registered.
    pub async fn interests_of(&self, connection_id: Uuid) -> Option<HashSet<String>> {
        self.connections
            .read()
            .await
            .get(&connection_id)
            .map(|conn| conn.interests.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (mpsc::Sender<EventFrame>, mpsc::Receiver<EventFrame>) {
        mpsc::channel(8)
    }

    #[tokio::test]
    async fn test_register_and_subscribe() {
        let registry = SubscriptionRegistry::new();
        let id = Uuid::new_v4();
        let (tx, _rx) = channel();

        registry.register(id, tx).await;
        assert_eq!(registry.connection_count().await, 1);
        assert!(registry.interests_of(id).await.unwrap().is_empty());

        assert!(registry.subscribe(id, "user.created").await);
        let interests = registry.interests_of(id).await.unwrap();
        assert!(interests.contains("user.created"));
    }

    #[tokio::test]
    async fn test_register_idempotent() {
        let registry = SubscriptionRegistry::new();
        let id = Uuid::new_v4();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();

        registry.register(id, tx1).await;
        registry.subscribe(id, "a").await;
        registry.register(id, tx2).await; // no-op, keeps interests

        assert_eq!(registry.connection_count().await, 1);
        assert!(registry.interests_of(id).await.unwrap().contains("a"));
    }

    #[tokio::test]
    async fn test_subscribe_unknown_connection() {
        let registry = SubscriptionRegistry::new();
        // Never panics, just reports failure
        assert!(!registry.subscribe(Uuid::new_v4(), "user.created").await);
    }

    #[tokio::test]
    async fn test_subscribe_duplicate_is_noop() {
        let registry = SubscriptionRegistry::new();
        let id = Uuid::new_v4();
        let (tx, _rx) = channel();
        registry.register(id, tx).await;

        registry.subscribe(id, "a").await;
        registry.subscribe(id, "a").await;
        assert_eq!(registry.interests_of(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let registry = SubscriptionRegistry::new();
        let id = Uuid::new_v4();
        let (tx, _rx) = channel();
        registry.register(id, tx).await;
        registry.subscribe(id, "a").await;

        assert!(registry.unsubscribe(id, "a").await);
        assert!(!registry.unsubscribe(id, "a").await); // already gone
        assert!(!registry.unsubscribe(id, "never-subscribed").await);
        assert!(registry.matched("a").await.is_empty());
    }

    #[tokio::test]
    async fn test_matched_snapshot() {
        let registry = SubscriptionRegistry::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();

        registry.register(first, tx1).await;
        registry.register(second, tx2).await;
        registry.subscribe(first, "order.paid").await;
        registry.subscribe(second, "order.paid").await;
        registry.subscribe(second, "order.shipped").await;

        let matched = registry.matched("order.paid").await;
        assert_eq!(matched.len(), 2);

        let matched = registry.matched("order.shipped").await;
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].0, second);

        assert!(registry.matched("order.cancelled").await.is_empty());
    }

    #[tokio::test]
    async fn test_deregister_removes_all_interests() {
        let registry = SubscriptionRegistry::new();
        let id = Uuid::new_v4();
        let (tx, _rx) = channel();
        registry.register(id, tx).await;
        registry.subscribe(id, "a").await;
        registry.subscribe(id, "b").await;

        assert!(registry.deregister(id).await);
        assert!(!registry.deregister(id).await); // idempotent
        assert_eq!(registry.connection_count().await, 0);
        assert!(registry.matched("a").await.is_empty());
        assert!(registry.matched("b").await.is_empty());
        assert!(registry.interests_of(id).await.is_none());
    }
}
