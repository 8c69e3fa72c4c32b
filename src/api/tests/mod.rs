use super::*;
use crate::broker::test_helpers::{ScriptedFetcher, create_test_broker, wait_for_status};
use crate::types::TaskStatus;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;

mod files;

/// Helper to create a test MediaBroker wrapped in Arc
async fn create_test_app(
    fetcher: ScriptedFetcher,
) -> (Arc<MediaBroker>, Router, tempfile::TempDir) {
    let (broker, temp_dir) = create_test_broker(Arc::new(fetcher)).await;
    let broker = Arc::new(broker);
    let app = create_router(broker.clone(), broker.config().clone());
    (broker, app, temp_dir)
}

async fn send(app: &Router, method: &str, uri: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let (broker, _app, _temp_dir) = create_test_app(ScriptedFetcher::default()).await;

    let mut config = (**broker.config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let broker = broker.clone();
        async move { start_api_server(broker, config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server exited early");
    api_handle.abort();
}

#[tokio::test]
async fn test_cors_enabled() {
    let (broker, _app, _temp_dir) = create_test_app(ScriptedFetcher::default()).await;

    let mut config = (**broker.config()).clone();
    config.server.api.cors_enabled = true;
    config.server.api.cors_origins = vec!["*".to_string()];
    let app = create_router(broker, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (broker, _app, _temp_dir) = create_test_app(ScriptedFetcher::default()).await;

    let mut config = (**broker.config()).clone();
    config.server.api.cors_enabled = false;
    let app = create_router(broker, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_swagger_ui_mounted_when_enabled() {
    let (broker, _app, _temp_dir) = create_test_app(ScriptedFetcher::default()).await;

    let mut config = (**broker.config()).clone();
    config.server.api.swagger_ui = true;
    let app = create_router(broker, Arc::new(config));

    let response = send(&app, "GET", "/swagger-ui/").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_server_answers_health_over_tcp() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let (_broker, app, _temp_dir) = create_test_app(ScriptedFetcher::default()).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();

    assert!(raw.starts_with("HTTP/1.1 200"), "unexpected response: {raw}");
    assert!(raw.contains("\"healthy\""));

    server.abort();
}
