use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use herald_core::config::HeraldConfig;
use herald_hub::MessageHub;
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::http::ui::PageTemplate;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: HeraldConfig,
    pub hub: MessageHub,
    pub page: PageTemplate,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: HeraldConfig) -> Self {
        let hub = MessageHub::from_config(&config.broadcast);
        let page = PageTemplate::load(config.ui.template_path.as_deref());
        Self {
            config,
            hub,
            page,
            started_at: Utc::now(),
        }
    }
}

/// Assemble the full Axum router.
///
/// Every route is served both at the root and under `/api`, matching the
/// page script's base-path detection.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .merge(routes())
        .nest("/api", routes())
        .with_state(state)
        .layer(CatchPanicLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(crate::http::ui::ui_handler))
        .route("/events", get(crate::http::events::events_handler))
        .route("/message", get(crate::http::message::message_handler))
        .route("/webhook", post(crate::http::webhook::webhook_handler))
        .route("/health", get(crate::http::health::health_handler))
}

fn cors_layer(config: &HeraldConfig) -> CorsLayer {
    let origin = if config.cors.allows_any() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            config
                .cors
                .allow_origin
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use futures_util::StreamExt;
    use herald_core::config::EmptyMessagePolicy;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_state(policy: EmptyMessagePolicy) -> Arc<AppState> {
        let mut config = HeraldConfig::default();
        config.broadcast.initial_message = "waiting".to_string();
        config.webhook.empty_policy = policy;
        Arc::new(AppState::new(config))
    }

    async fn body_json(res: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(res.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn webhook_json_updates_message() {
        let state = test_state(EmptyMessagePolicy::Ignore);
        let app = build_router(state.clone());

        let res = app
            .oneshot(post_json("/webhook", r#"{"message":"hello"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["status"], "success");
        assert_eq!(json["message"], "Message updated");
        assert_eq!(state.hub.current(), "hello");
    }

    #[tokio::test]
    async fn webhook_form_updates_message() {
        let state = test_state(EmptyMessagePolicy::Ignore);
        let app = build_router(state.clone());

        let req = Request::post("/webhook")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("message=from+form"))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(state.hub.current(), "from form");
    }

    #[tokio::test]
    async fn webhook_multipart_updates_message() {
        let state = test_state(EmptyMessagePolicy::Ignore);
        let mut sub = state.hub.broadcaster().subscribe();
        let app = build_router(state.clone());

        let req = Request::post("/webhook")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XyZ")
            .body(Body::from(
                "--XyZ\r\nContent-Disposition: form-data; name=\"message\"\r\n\r\nhello\r\n--XyZ--\r\n",
            ))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["status"], "success");
        assert_eq!(state.hub.current(), "hello");
        assert_eq!(sub.try_recv().as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn webhook_form_content_type_any_case() {
        let state = test_state(EmptyMessagePolicy::Ignore);
        let app = build_router(state.clone());

        let req = Request::post("/webhook")
            .header(header::CONTENT_TYPE, "Application/X-WWW-Form-Urlencoded")
            .body(Body::from("message=shout"))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(state.hub.current(), "shout");
    }

    #[tokio::test]
    async fn webhook_empty_message_is_ignored() {
        let state = test_state(EmptyMessagePolicy::Ignore);
        let mut sub = state.hub.broadcaster().subscribe();
        let app = build_router(state.clone());

        let res = app
            .oneshot(post_json("/webhook", r#"{"message":""}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["status"], "success");
        assert_eq!(state.hub.current(), "waiting");
        assert_eq!(sub.try_recv(), None);
    }

    #[tokio::test]
    async fn webhook_empty_message_rejected_by_policy() {
        let state = test_state(EmptyMessagePolicy::Reject);
        let app = build_router(state.clone());

        let res = app.oneshot(post_json("/webhook", "{}")).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["code"], "EMPTY_MESSAGE");
        assert_eq!(state.hub.current(), "waiting");
    }

    #[tokio::test]
    async fn webhook_malformed_body() {
        let state = test_state(EmptyMessagePolicy::Ignore);
        let app = build_router(state.clone());

        let res = app.oneshot(post_json("/webhook", "{not json")).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["error"], "Invalid request format");
        assert_eq!(state.hub.current(), "waiting");
    }

    #[tokio::test]
    async fn message_snapshot() {
        let state = test_state(EmptyMessagePolicy::Ignore);
        state.hub.update("z");
        let app = build_router(state);

        let res = app
            .oneshot(Request::get("/message").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await, serde_json::json!({"message": "z"}));
    }

    #[tokio::test]
    async fn api_prefix_serves_same_routes() {
        let state = test_state(EmptyMessagePolicy::Ignore);
        let app = build_router(state.clone());

        let res = app
            .oneshot(post_json("/api/webhook", r#"{"message":"via api"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(state.hub.current(), "via api");
    }

    #[tokio::test]
    async fn index_page_escapes_message() {
        let state = test_state(EmptyMessagePolicy::Ignore);
        state.hub.update("<b>hi</b>");
        let app = build_router(state);

        let res = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = to_bytes(res.into_body(), 64 * 1024).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("&lt;b&gt;hi&lt;/b&gt;"));
        assert!(!html.contains("<b>hi</b>"));
        assert!(html.contains("EventSource"));
    }

    #[tokio::test]
    async fn health_reports_subscribers() {
        let state = test_state(EmptyMessagePolicy::Ignore);
        let _sub = state.hub.broadcaster().subscribe();
        let app = build_router(state);

        let res = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(res).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["subscribers"], 1);
        assert!(json["git_sha"].as_str().is_some_and(|sha| !sha.is_empty()));
    }

    #[tokio::test]
    async fn events_stream_snapshot_then_update() {
        let state = test_state(EmptyMessagePolicy::Ignore);
        let app = build_router(state.clone());

        let res = app
            .oneshot(Request::get("/events").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(res.headers()[header::CACHE_CONTROL], "no-cache");
        assert_eq!(res.headers()["x-accel-buffering"], "no");

        let mut body = res.into_body().into_data_stream();
        let first = tokio::time::timeout(Duration::from_secs(2), body.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(&first[..], b"data: waiting\n\n");
        assert_eq!(state.hub.subscriber_count(), 1);

        state.hub.update("hello");
        let second = tokio::time::timeout(Duration::from_secs(2), body.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(&second[..], b"data: hello\n\n");

        drop(body);
        assert_eq!(state.hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn events_stream_keepalive_comment() {
        let mut config = HeraldConfig::default();
        config.broadcast.keepalive_secs = 1;
        let state = Arc::new(AppState::new(config));
        let app = build_router(state);

        let res = app
            .oneshot(Request::get("/events").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let mut body = res.into_body().into_data_stream();
        body.next().await;

        let ping = tokio::time::timeout(Duration::from_secs(3), body.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(&ping[..], b": keepalive\n\n");
    }
}
