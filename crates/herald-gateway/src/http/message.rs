use axum::{extract::State, Json};
use herald_core::types::MessageSnapshot;
use std::sync::Arc;

use crate::app::AppState;

/// GET /message — current message for clients that poll instead of streaming.
pub async fn message_handler(State(state): State<Arc<AppState>>) -> Json<MessageSnapshot> {
    Json(MessageSnapshot {
        message: state.hub.current(),
    })
}
