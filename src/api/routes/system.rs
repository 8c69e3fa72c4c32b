//! System handlers: index, health, diagnostics, cleanup, OpenAPI.

use super::IdQuery;
use crate::api::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// GET / - Service index
#[utoipa::path(
    get,
    path = "/",
    tag = "system",
    responses(
        (status = 200, description = "Service name, version and endpoint listing")
    )
)]
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "fetcher": state.broker.fetcher_name(),
        "cache_expire_hours": state.config.storage.cache_ttl.as_secs_f64() / 3600.0,
        "endpoints": {
            "downloads": {
                "POST /download?id=VIDEO_ID": "Start a download task",
                "GET /status?id=VIDEO_ID": "Task status",
                "GET /files/audio?id=VIDEO_ID": "Audio file (Range supported)",
                "GET /files/subtitle?id=VIDEO_ID": "Subtitle file",
                "GET /info?id=VIDEO_ID": "Video info",
                "DELETE /cancel?id=VIDEO_ID": "Cancel a download task"
            },
            "catalog": {
                "GET /api/channel/info?id=CHANNEL": "Channel info",
                "GET /api/channel/videos?id=CHANNEL&limit=20": "Channel videos",
                "GET /api/video/info?id=VIDEO_ID": "Detailed video info",
                "GET /api/search/channel?q=QUERY&limit=10": "Channel search",
                "GET /api/cookies/status": "Cookies file status"
            },
            "utility": {
                "GET /health": "Health check",
                "GET /debug/files?id=VIDEO_ID": "List a resource's files",
                "GET /fix/files?id=VIDEO_ID": "Fix a missing audio extension",
                "GET /api/cookies/diagnose": "Inspect the cookies file",
                "GET /api/test/youtube/VIDEO_ID": "Test metadata extraction for a video",
                "POST /admin/cleanup": "Run cache cleanup now",
                "GET /openapi.json": "OpenAPI document"
            }
        },
        "supported_channel_formats": [
            "@handle",
            "channel ID (UC...)",
            "channel name"
        ]
    }))
}

/// GET /health - Health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy", body = crate::types::HealthReport)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.broker.health().await)
}

/// GET /debug/files - Files sharing a resource's artifact prefix
#[utoipa::path(
    get,
    path = "/debug/files",
    tag = "system",
    params(IdQuery),
    responses(
        (status = 200, description = "File listing", body = crate::types::DebugFilesReport),
        (status = 400, description = "Missing or invalid id", body = crate::error::ApiError)
    )
)]
pub async fn debug_files(State(state): State<AppState>, Query(query): Query<IdQuery>) -> Response {
    let id = match query.require() {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match state.broker.debug_files(id).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /fix/files - Rename an extension-less audio file to `.mp3`
#[utoipa::path(
    get,
    path = "/fix/files",
    tag = "system",
    params(IdQuery),
    responses(
        (status = 200, description = "Actions taken", body = crate::types::FixFilesReport),
        (status = 400, description = "Missing or invalid id", body = crate::error::ApiError)
    )
)]
pub async fn fix_files(State(state): State<AppState>, Query(query): Query<IdQuery>) -> Response {
    let id = match query.require() {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match state.broker.fix_files(id).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/cookies/diagnose - Inspect the cookies file contents
#[utoipa::path(
    get,
    path = "/api/cookies/diagnose",
    tag = "system",
    responses(
        (status = 200, description = "Cookies file diagnosis", body = crate::types::CookiesDiagnosis)
    )
)]
pub async fn cookies_diagnose(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.broker.cookies_diagnosis().await)
}

/// GET /api/test/youtube/:video_id - Test metadata extraction for one video
///
/// Extraction failures are reported in the body with a 200.
#[utoipa::path(
    get,
    path = "/api/test/youtube/{video_id}",
    tag = "system",
    params(("video_id" = String, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Connection test result", body = crate::types::ConnectionTest),
        (status = 400, description = "Invalid video id", body = crate::error::ApiError)
    )
)]
pub async fn test_connection(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Response {
    match state.broker.test_connection(&video_id).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /admin/cleanup - Run one janitor sweep now
#[utoipa::path(
    post,
    path = "/admin/cleanup",
    tag = "system",
    responses(
        (status = 200, description = "Cleanup finished")
    )
)]
pub async fn admin_cleanup(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.broker.cleanup_now().await;
    let counts = state.broker.registry().counts().await;

    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "message": "Manual cleanup completed",
            "cleanup_results": {
                "files_removed": report.files_removed,
                "cache_files_removed": report.cache_files_removed,
                "tasks_cleaned": report.tasks_evicted,
                "protected_paths": report.protected_paths,
                "errors": report.errors,
                "remaining_tasks": counts.total,
                "active_tasks": counts.active,
                "completed_tasks": counts.completed,
            }
        })),
    )
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}
