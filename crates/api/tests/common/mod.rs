use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use sqlx::PgPool;
use tower::ServiceExt;

use quoteframe_api::config::ServerConfig;
use quoteframe_api::router::build_app_router;
use quoteframe_api::state::AppState;
use quoteframe_chat::signature::sign;
use quoteframe_chat::HttpChatClient;
use quoteframe_pipeline::detector::HttpQuoteDetector;
use quoteframe_pipeline::queue::PgJobQueue;
use quoteframe_pipeline::PipelineIntake;

/// Signing secret used by all test requests.
pub const TEST_SIGNING_SECRET: &str = "test-signing-secret";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        signing_secret: TEST_SIGNING_SECRET.to_string(),
        detector_api_key: "test-detector-key".to_string(),
    }
}

/// Build the full application router with all middleware layers, using
/// the given database pool.
///
/// This mirrors the router construction in `main.rs` so integration
/// tests exercise the same middleware stack (request ID, timeout,
/// tracing, panic recovery) that production uses. The detector and chat
/// clients point at their production hosts; tests below the signature
/// layer never reach them.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let event_bus = Arc::new(quoteframe_events::EventBus::default());

    let intake = Arc::new(PipelineIntake::new(
        pool.clone(),
        HttpQuoteDetector::new("test-detector-key"),
        PgJobQueue::new(pool.clone()),
        HttpChatClient::new(),
        Arc::clone(&event_bus),
    ));

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus,
        intake,
    };

    build_app_router(state, &config)
}

/// Issue a GET request against the app.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    app.oneshot(request).await.expect("request should succeed")
}

/// POST a body with a valid signature over it.
pub async fn post_signed(app: Router, uri: &str, body: &str) -> Response<Body> {
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature = sign(TEST_SIGNING_SECRET, &timestamp, body.as_bytes());
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-request-timestamp", timestamp)
        .header("x-request-signature", signature)
        .body(Body::from(body.to_string()))
        .expect("build request");
    app.oneshot(request).await.expect("request should succeed")
}

/// POST a body with no signature headers at all.
pub async fn post_unsigned(app: Router, uri: &str, body: &str) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request");
    app.oneshot(request).await.expect("request should succeed")
}

/// Read a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// Assert a response is the standard JSON error shape with this status.
pub async fn assert_error(response: Response<Body>, status: StatusCode, code: &str) {
    assert_eq!(response.status(), status);
    let json = body_json(response).await;
    assert_eq!(json["code"], code);
    assert!(json["error"].is_string());
}
