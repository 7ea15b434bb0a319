//! Webhook ingress endpoint — POST /webhook.
//!
//! Accepts `{"message": "..."}` as JSON, `message=...` as a urlencoded
//! form, or a multipart form with a `message` part. A non-empty message
//! becomes the current message and is pushed to every open event stream.
//! Missing or empty messages follow the configured `webhook.empty_policy`.

use axum::{
    body::to_bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    Form, Json,
};
use herald_core::{
    config::{EmptyMessagePolicy, MAX_WEBHOOK_BYTES},
    error::HeraldError,
    types::{ErrorBody, WebhookAck, WebhookRequest},
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::app::AppState;

// ── Public handler ────────────────────────────────────────────────────────────

/// POST /webhook
///
/// Returns 200 + ack on success (including an ignored empty message),
/// 400 on a malformed body or a rejected empty message.
pub async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<WebhookAck>, (StatusCode, Json<ErrorBody>)> {
    let payload = parse_payload(request).await.map_err(|e| {
        warn!(error = %e, "invalid webhook body");
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new("Invalid request format")),
        )
    })?;

    match payload.non_empty_message() {
        Some(message) => {
            state.hub.update(message);
            info!(
                bytes = message.len(),
                subscribers = state.hub.subscriber_count(),
                "webhook accepted"
            );
        }
        None => match state.config.webhook.empty_policy {
            EmptyMessagePolicy::Ignore => {
                info!("webhook without message, current message unchanged");
            }
            EmptyMessagePolicy::Reject => {
                let err = HeraldError::EmptyMessage;
                warn!(error = %err, "webhook rejected");
                return Err((StatusCode::BAD_REQUEST, Json(ErrorBody::from_error(&err))));
            }
        },
    }

    Ok(Json(WebhookAck::success()))
}

// ── Body parsing ──────────────────────────────────────────────────────────────

/// How the request body is encoded, from its `Content-Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    UrlEncoded,
    Multipart,
}

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const FORM_MULTIPART: &str = "multipart/form-data";

/// Decode the body according to its content type, JSON when absent or
/// unrecognized. An empty body decodes to a request without a message.
async fn parse_payload(mut request: Request) -> Result<WebhookRequest, HeraldError> {
    match body_kind(request.headers()) {
        BodyKind::UrlEncoded => {
            canonical_content_type(request.headers_mut(), FORM_URLENCODED);
            let Form(payload) = Form::<WebhookRequest>::from_request(request, &())
                .await
                .map_err(|e| HeraldError::InvalidRequest(e.body_text()))?;
            Ok(payload)
        }
        BodyKind::Multipart => {
            canonical_content_type(request.headers_mut(), FORM_MULTIPART);
            parse_multipart(request).await
        }
        BodyKind::Json => {
            let body = to_bytes(request.into_body(), MAX_WEBHOOK_BYTES)
                .await
                .map_err(|e| HeraldError::InvalidRequest(e.to_string()))?;

            if body.iter().all(u8::is_ascii_whitespace) {
                return Ok(WebhookRequest::default());
            }

            Ok(serde_json::from_slice(&body)?)
        }
    }
}

/// Read the `message` part of a multipart form; other parts are skipped.
async fn parse_multipart(request: Request) -> Result<WebhookRequest, HeraldError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| HeraldError::InvalidRequest(e.body_text()))?;

    let mut payload = WebhookRequest::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HeraldError::InvalidRequest(e.body_text()))?
    {
        if field.name() == Some("message") {
            let text = field
                .text()
                .await
                .map_err(|e| HeraldError::InvalidRequest(e.body_text()))?;
            payload.message = Some(text);
        }
    }
    Ok(payload)
}

/// Rewrite the media type in lowercase, keeping its parameters. The axum
/// extractors only recognize the lowercase spelling.
fn canonical_content_type(headers: &mut HeaderMap, essence: &str) {
    let value = match headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split_once(';'))
    {
        Some((_, params)) => format!("{essence};{params}"),
        None => essence.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(header::CONTENT_TYPE, value);
    }
}

/// Media types are case-insensitive; parameters after `;` are ignored.
fn body_kind(headers: &HeaderMap) -> BodyKind {
    let essence = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());

    match essence.as_deref() {
        Some(FORM_URLENCODED) => BodyKind::UrlEncoded,
        Some(FORM_MULTIPART) => BodyKind::Multipart,
        _ => BodyKind::Json,
    }
}
