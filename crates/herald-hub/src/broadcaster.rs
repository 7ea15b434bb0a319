use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;

/// Opaque identity of one streaming connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Fan-out of published values to every registered subscriber queue.
///
/// The registry only holds the sending half of each queue. Removing an
/// entry drops that sender, which closes the queue for its reader once the
/// already-buffered values are drained.
#[derive(Clone)]
pub struct Broadcaster {
    clients: Arc<DashMap<SubscriberId, mpsc::Sender<String>>>,
    capacity: usize,
}

impl Broadcaster {
    /// `capacity` is the per-subscriber queue bound (at least 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            clients: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Register a new bounded queue and hand its reading side to the caller.
    pub fn subscribe(&self) -> Subscription {
        let id = SubscriberId::new();
        let (tx, rx) = mpsc::channel(self.capacity);
        self.clients.insert(id, tx);
        debug!(subscriber_id = %id, subscribers = self.clients.len(), "subscriber registered");

        Subscription {
            id,
            rx,
            registry: self.clone(),
            registered: true,
        }
    }

    /// Remove a subscriber and close its queue. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: &SubscriberId) {
        if self.clients.remove(id).is_some() {
            debug!(subscriber_id = %id, subscribers = self.clients.len(), "subscriber removed");
        }
    }

    /// Try to enqueue `value` on every subscriber without waiting.
    ///
    /// A subscriber whose queue is full is treated as dead: it is dropped
    /// from the registry and its queue is closed. Queues whose reader is
    /// already gone are dropped the same way.
    pub fn publish(&self, value: &str) {
        let mut delivered = 0usize;
        let mut pruned = 0usize;

        self.clients.retain(|id, tx| match tx.try_send(value.to_string()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(subscriber_id = %id, "subscriber queue full, dropping slow consumer");
                pruned += 1;
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(subscriber_id = %id, "subscriber queue closed, dropping");
                pruned += 1;
                false
            }
        });

        debug!(delivered, pruned, "published message");
    }

    /// Number of registered subscribers.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Drop every subscriber, closing all queues. Used at shutdown.
    pub fn close_all(&self) {
        let count = self.clients.len();
        self.clients.clear();
        if count > 0 {
            debug!(subscribers = count, "closed all subscriber queues");
        }
    }
}

/// The reading side of one subscriber's queue.
///
/// Owned by the streaming connection. Dropping it deregisters the
/// subscriber, so a transport that simply drops the stream still cleans up.
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<String>,
    registry: Broadcaster,
    registered: bool,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next value. `None` once the queue is closed and drained.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Next buffered value without waiting.
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    /// Leave the registry and close the queue. Safe to call repeatedly,
    /// and after the subscriber was pruned by a publish.
    pub fn unsubscribe(&mut self) {
        if self.registered {
            self.registered = false;
            self.registry.unsubscribe(&self.id);
        }
        self.rx.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
