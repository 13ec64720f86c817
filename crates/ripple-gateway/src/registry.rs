use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

/// Outbound queue depth per connection. A client that cannot drain this
/// many pending frames is treated as dead.
pub const SEND_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("user {0} has no live connection")]
    NotConnected(i64),
    #[error("send queue for user {0} is full or closed")]
    QueueUnavailable(i64),
}

/// Directory of live connections: user id -> (conn id, outbound sender).
/// At most one connection per user; registering a replacement drops the
/// displaced sender, which closes the old connection's queue.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    connections: RwLock<HashMap<i64, (Uuid, mpsc::Sender<String>)>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                connections: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Install a fresh outbound channel for the user. Any displaced entry
    /// is dropped here, closing the previous connection's receive loop.
    pub async fn register(&self, user_id: i64) -> (Uuid, mpsc::Receiver<String>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(SEND_QUEUE_CAPACITY);
        let displaced = self
            .inner
            .connections
            .write()
            .await
            .insert(user_id, (conn_id, tx));
        if displaced.is_some() {
            debug!("Replaced live connection for user {}", user_id);
        }
        (conn_id, rx)
    }

    /// Remove the user's entry, but only if conn_id still matches — a
    /// stale disconnect must not tear down a newer connection.
    pub async fn unregister(&self, user_id: i64, conn_id: Uuid) {
        let mut connections = self.inner.connections.write().await;
        if let Some((stored, _)) = connections.get(&user_id) {
            if *stored == conn_id {
                connections.remove(&user_id);
            }
        }
    }

    /// Best-effort targeted push. Returns false when the user is offline
    /// or their queue is dead; never blocks and never errors upward.
    pub async fn unicast(&self, user_id: i64, text: String) -> bool {
        match self.try_unicast(user_id, text).await {
            Ok(()) => true,
            Err(DeliveryError::NotConnected(_)) => {
                debug!("No live connection for user {}, push skipped", user_id);
                false
            }
            Err(e) => {
                warn!("Push to user {} failed: {}", user_id, e);
                false
            }
        }
    }

    pub async fn try_unicast(&self, user_id: i64, text: String) -> Result<(), DeliveryError> {
        let entry = {
            let connections = self.inner.connections.read().await;
            connections.get(&user_id).cloned()
        };
        let Some((conn_id, tx)) = entry else {
            return Err(DeliveryError::NotConnected(user_id));
        };

        if tx.try_send(text).is_err() {
            // Full or closed either way means the connection is dead.
            // Evict it so the next push short-circuits to NotConnected.
            self.unregister(user_id, conn_id).await;
            return Err(DeliveryError::QueueUnavailable(user_id));
        }
        Ok(())
    }

    /// Push to every live connection, evicting the ones whose queues are
    /// dead. Only client liveness frames flow through this today.
    pub async fn broadcast(&self, text: &str) {
        let entries: Vec<(i64, Uuid, mpsc::Sender<String>)> = {
            let connections = self.inner.connections.read().await;
            connections
                .iter()
                .map(|(&uid, (cid, tx))| (uid, *cid, tx.clone()))
                .collect()
        };

        for (user_id, conn_id, tx) in entries {
            if tx.try_send(text.to_string()).is_err() {
                warn!("Broadcast to user {} failed, evicting connection", user_id);
                self.unregister(user_id, conn_id).await;
            }
        }
    }

    pub async fn is_connected(&self, user_id: i64) -> bool {
        self.inner.connections.read().await.contains_key(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registering_again_closes_the_displaced_queue() {
        let registry = Registry::new();
        let (_, mut rx1) = registry.register(7).await;
        let (_, mut rx2) = registry.register(7).await;

        // The first connection's queue is closed, not silently orphaned
        assert!(rx1.recv().await.is_none());

        assert!(registry.unicast(7, "hello".into()).await);
        assert_eq!(rx2.recv().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn unicast_to_absent_user_is_a_benign_false() {
        let registry = Registry::new();
        assert!(!registry.unicast(42, "nobody home".into()).await);
        assert!(!registry.is_connected(42).await);
    }

    #[tokio::test]
    async fn full_queue_evicts_the_connection() {
        let registry = Registry::new();
        let (_, _rx) = registry.register(1).await;

        // Never drain: the queue fills at SEND_QUEUE_CAPACITY, then the
        // next push fails and evicts
        for i in 0..SEND_QUEUE_CAPACITY {
            assert!(registry.unicast(1, format!("msg {}", i)).await);
        }
        assert!(!registry.unicast(1, "overflow".into()).await);
        assert!(!registry.is_connected(1).await);
    }

    #[tokio::test]
    async fn stale_unregister_leaves_the_newer_connection_alone() {
        let registry = Registry::new();
        let (old_conn, _rx1) = registry.register(5).await;
        let (_, _rx2) = registry.register(5).await;

        registry.unregister(5, old_conn).await;
        assert!(registry.is_connected(5).await);
    }

    #[tokio::test]
    async fn pushes_to_one_recipient_arrive_in_order() {
        let registry = Registry::new();
        let (_, mut rx) = registry.register(3).await;

        for i in 0..10 {
            assert!(registry.unicast(3, format!("{}", i)).await);
        }
        for i in 0..10 {
            assert_eq!(rx.recv().await, Some(format!("{}", i)));
        }
    }
}
