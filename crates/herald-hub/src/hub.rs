use std::time::Duration;

use futures_util::Stream;
use herald_core::config::BroadcastConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::broadcaster::Broadcaster;
use crate::state::SharedState;
use crate::stream::{subscriber_stream, StreamEvent};

/// The current message plus everyone listening for changes to it.
///
/// Built once at startup and handed to the transport layer. The state
/// lock and the registry lock are never held at the same time.
pub struct MessageHub {
    state: SharedState,
    broadcaster: Broadcaster,
    keepalive: Duration,
    shutdown: CancellationToken,
}

impl MessageHub {
    pub fn new(initial: impl Into<String>, queue_capacity: usize, keepalive: Duration) -> Self {
        Self {
            state: SharedState::new(initial),
            broadcaster: Broadcaster::new(queue_capacity),
            keepalive,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn from_config(config: &BroadcastConfig) -> Self {
        Self::new(
            config.initial_message.clone(),
            config.queue_capacity,
            Duration::from_secs(config.keepalive_secs),
        )
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Snapshot of the current message.
    pub fn current(&self) -> String {
        self.state.get()
    }

    /// Store `value` as the current message, then fan it out.
    ///
    /// Empty strings are stored and published like any other value;
    /// filtering them is up to the caller.
    ///
    /// The store and the fan-out are two separate steps. Under concurrent
    /// updates the value left in state is not guaranteed to be the last one
    /// subscribers received.
    pub fn update(&self, value: impl Into<String>) {
        let value = value.into();
        self.state.set(value.clone());
        self.broadcaster.publish(&value);
        debug!(subscribers = self.broadcaster.len(), "current message updated");
    }

    pub fn subscriber_count(&self) -> usize {
        self.broadcaster.len()
    }

    /// Open a stream that ends on hub shutdown or when dropped.
    pub fn open_stream(&self) -> impl Stream<Item = StreamEvent> + Send + 'static {
        self.open_stream_until(self.shutdown.child_token())
    }

    /// Open a stream bound to `cancel`.
    ///
    /// Subscribes before reading the snapshot, so an update racing with the
    /// connection is seen at least once.
    pub fn open_stream_until(
        &self,
        cancel: CancellationToken,
    ) -> impl Stream<Item = StreamEvent> + Send + 'static {
        let subscription = self.broadcaster.subscribe();
        let snapshot = self.state.get();
        subscriber_stream(subscription, snapshot, self.keepalive, cancel)
    }

    /// End every open stream and close all subscriber queues.
    pub fn shutdown(&self) {
        info!(subscribers = self.broadcaster.len(), "shutting down message hub");
        self.shutdown.cancel();
        self.broadcaster.close_all();
    }
}
