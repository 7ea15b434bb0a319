use std::time::Duration;

use futures_util::Stream;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::broadcaster::Subscription;

/// One item delivered to a streaming peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A content update (the initial snapshot is also one).
    Message(String),
    /// Inert keep-alive; never to be treated as content.
    KeepAlive,
}

/// Per-connection streaming loop.
///
/// Yields `snapshot` first, then waits on whichever comes first:
/// a queued value, the keep-alive tick, or `cancel`. The loop also ends
/// when the queue closes (pruned as a slow consumer, or hub shutdown).
/// On every exit path the subscription is unsubscribed; if the consumer
/// drops the stream mid-wait, `Subscription`'s drop does the same.
pub fn subscriber_stream(
    mut subscription: Subscription,
    snapshot: String,
    keepalive: Duration,
    cancel: CancellationToken,
) -> impl Stream<Item = StreamEvent> + Send + 'static {
    async_stream::stream! {
        let id = subscription.id();
        yield StreamEvent::Message(snapshot);

        let mut tick = interval_at(Instant::now() + keepalive, keepalive);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(subscriber_id = %id, "stream cancelled");
                    None
                }
                msg = subscription.recv() => {
                    if msg.is_none() {
                        debug!(subscriber_id = %id, "subscriber queue closed");
                    }
                    msg.map(StreamEvent::Message)
                }
                _ = tick.tick() => Some(StreamEvent::KeepAlive),
            };

            match next {
                Some(event) => yield event,
                None => break,
            }
        }

        subscription.unsubscribe();
    }
}
