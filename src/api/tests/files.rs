use super::*;
use crate::api::routes::SUBTITLE_CONTENT_TYPE;
use crate::types::ArtifactKind;
use axum::http::header;

fn content_type(response: &Response) -> &str {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

#[tokio::test]
async fn test_serve_audio_after_download() {
    let (broker, app, _temp_dir) = create_test_app(ScriptedFetcher::default()).await;
    send(&app, "POST", "/download?id=abc123").await;
    wait_for_status(&broker, "abc123", TaskStatus::Completed).await;

    let response = send(&app, "GET", "/files/audio?id=abc123").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), "audio/mpeg");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"audio-bytes");
}

#[tokio::test]
async fn test_serve_audio_honors_range() {
    let (broker, app, _temp_dir) = create_test_app(ScriptedFetcher::default()).await;
    std::fs::write(
        broker.paths().canonical_path("abc123", ArtifactKind::Audio),
        b"0123456789",
    )
    .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/files/audio?id=abc123")
                .header(header::RANGE, "bytes=2-5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"2345");
}

#[tokio::test]
async fn test_serve_extensionless_audio_as_mp4() {
    let (broker, app, _temp_dir) = create_test_app(ScriptedFetcher::default()).await;
    std::fs::write(broker.paths().base_path("abc123"), b"bare").unwrap();

    let response = send(&app, "GET", "/files/audio?id=abc123").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), "audio/mp4");
}

#[tokio::test]
async fn test_serve_audio_missing() {
    let (_broker, app, _temp_dir) = create_test_app(ScriptedFetcher::default()).await;

    let response = send(&app, "GET", "/files/audio?id=abc123").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, "GET", "/files/audio").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_serve_subtitle_as_plain_text() {
    let (broker, app, _temp_dir) = create_test_app(ScriptedFetcher::default()).await;
    send(&app, "POST", "/download?id=abc123").await;
    wait_for_status(&broker, "abc123", TaskStatus::Completed).await;

    let response = send(&app, "GET", "/files/subtitle?id=abc123").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), SUBTITLE_CONTENT_TYPE);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(body.starts_with(b"WEBVTT"));
}

#[tokio::test]
async fn test_serve_subtitle_missing() {
    let (_broker, app, _temp_dir) = create_test_app(ScriptedFetcher::default()).await;

    let response = send(&app, "GET", "/files/subtitle?id=abc123").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
