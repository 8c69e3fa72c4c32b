//! Artifact serving handlers.

use super::IdQuery;
use crate::api::AppState;
use crate::paths::mime_for;
use axum::{
    body::Body,
    extract::{Query, Request, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use std::path::Path;
use tower::ServiceExt;
use tower_http::services::ServeFile;

/// Content type of served subtitles
pub const SUBTITLE_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// GET /files/audio - Serve the audio artifact
///
/// Supports `Range`, `If-Modified-Since` and `HEAD`.
#[utoipa::path(
    get,
    path = "/files/audio",
    tag = "files",
    params(IdQuery),
    responses(
        (status = 200, description = "Audio bytes", content_type = "audio/mpeg"),
        (status = 206, description = "Partial audio bytes"),
        (status = 400, description = "Missing id", body = crate::error::ApiError),
        (status = 404, description = "No audio file for this resource", body = crate::error::ApiError)
    )
)]
pub async fn serve_audio(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
    request: Request,
) -> Response {
    let id = match query.require() {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match state.broker.audio_file(id).await {
        Ok(path) => {
            let mime = mime_for(&path);
            tracing::info!(resource_id = %id, file = %path.display(), mime, "Serving audio file");
            serve_path(&path, mime, request).await
        }
        Err(e) => {
            tracing::warn!(resource_id = %id, "Audio file not found");
            e.into_response()
        }
    }
}

/// GET /files/subtitle - Serve the subtitle artifact as plain text
#[utoipa::path(
    get,
    path = "/files/subtitle",
    tag = "files",
    params(IdQuery),
    responses(
        (status = 200, description = "Subtitle text", content_type = "text/plain"),
        (status = 400, description = "Missing id", body = crate::error::ApiError),
        (status = 404, description = "No subtitle file for this resource", body = crate::error::ApiError)
    )
)]
pub async fn serve_subtitle(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
    request: Request,
) -> Response {
    let id = match query.require() {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match state.broker.subtitle_file(id).await {
        Ok(path) => {
            tracing::info!(resource_id = %id, file = %path.display(), "Serving subtitle file");
            serve_path(&path, SUBTITLE_CONTENT_TYPE, request).await
        }
        Err(e) => e.into_response(),
    }
}

async fn serve_path(path: &Path, content_type: &'static str, request: Request) -> Response {
    let response = match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    let mut response = response.map(Body::new);
    // ServeFile guesses from the extension; extension-less artifacts need ours
    if response.headers().contains_key(header::CONTENT_TYPE) {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    response
}
