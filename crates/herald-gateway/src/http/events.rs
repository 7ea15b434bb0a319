//! Server-sent event stream — GET /events.
//!
//! Each connection subscribes to the hub, receives the current message as
//! its first event, then every update until the peer goes away or the
//! server shuts down. Idle streams get a `: keepalive` comment so proxies
//! keep the connection open; EventSource clients ignore comments.

use axum::{
    extract::State,
    http::{header, HeaderName},
    response::{
        sse::{Event, Sse},
        IntoResponse,
    },
};
use futures_util::StreamExt;
use herald_hub::StreamEvent;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;

use crate::app::AppState;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// GET /events
pub async fn events_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!(subscribers = state.hub.subscriber_count(), "event stream opened");

    let stream = state
        .hub
        .open_stream()
        .map(|event| Ok::<_, Infallible>(to_sse(event)));

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
            (X_ACCEL_BUFFERING, "no"),
        ],
        Sse::new(stream),
    )
}

fn to_sse(event: StreamEvent) -> Event {
    match event {
        // Multi-line values become several `data:` lines.
        StreamEvent::Message(value) => Event::default().data(normalize_newlines(&value)),
        StreamEvent::KeepAlive => Event::default().comment("keepalive"),
    }
}

/// SSE lines end at `\n`; bare `\r` would split a frame.
fn normalize_newlines(value: &str) -> String {
    value.replace("\r\n", "\n").replace('\r', "\n")
}
