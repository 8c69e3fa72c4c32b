//! Metadata lookup handlers.

use super::{
    ChannelVideosQuery, DEFAULT_CHANNEL_VIDEOS_LIMIT, DEFAULT_SEARCH_LIMIT, IdQuery, SearchQuery,
    parse_limit,
};
use crate::api::AppState;
use crate::error::Error;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// GET /info - Video info for a resource
///
/// Prefers the info file written next to the artifacts.
#[utoipa::path(
    get,
    path = "/info",
    tag = "catalog",
    params(IdQuery),
    responses(
        (status = 200, description = "Video info", body = crate::types::VideoInfo),
        (status = 400, description = "Missing id or lookup failed", body = crate::error::ApiError)
    )
)]
pub async fn get_info(State(state): State<AppState>, Query(query): Query<IdQuery>) -> Response {
    let id = match query.require() {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match state.broker.info(id).await {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e) => lookup_failed("video info", e),
    }
}

/// GET /api/video/info - Detailed video info
#[utoipa::path(
    get,
    path = "/api/video/info",
    tag = "catalog",
    params(IdQuery),
    responses(
        (status = 200, description = "Video info", body = crate::types::VideoInfo),
        (status = 400, description = "Missing id or lookup failed", body = crate::error::ApiError)
    )
)]
pub async fn video_info(State(state): State<AppState>, Query(query): Query<IdQuery>) -> Response {
    let id = match query.require() {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match state.broker.catalog().video_info(id).await {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e) => lookup_failed("video info", e),
    }
}

/// GET /api/channel/info - Channel info
#[utoipa::path(
    get,
    path = "/api/channel/info",
    tag = "catalog",
    params(IdQuery),
    responses(
        (status = 200, description = "Channel info", body = crate::types::ChannelInfo),
        (status = 400, description = "Missing id or lookup failed", body = crate::error::ApiError)
    )
)]
pub async fn channel_info(State(state): State<AppState>, Query(query): Query<IdQuery>) -> Response {
    let id = match query.require() {
        Ok(id) => id,
        Err(_) => return Error::Validation("Missing channel id".into()).into_response(),
    };

    match state.broker.catalog().channel_info(id).await {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e) => lookup_failed("channel info", e),
    }
}

/// GET /api/channel/videos - Latest uploads of a channel
#[utoipa::path(
    get,
    path = "/api/channel/videos",
    tag = "catalog",
    params(ChannelVideosQuery),
    responses(
        (status = 200, description = "`{videos, count}`"),
        (status = 400, description = "Missing id or lookup failed", body = crate::error::ApiError)
    )
)]
pub async fn channel_videos(
    State(state): State<AppState>,
    Query(query): Query<ChannelVideosQuery>,
) -> Response {
    let Some(id) = query.id.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
        return Error::Validation("Missing channel id".into()).into_response();
    };
    let limit = parse_limit(query.limit.as_deref(), DEFAULT_CHANNEL_VIDEOS_LIMIT);

    match state.broker.catalog().channel_videos(id, limit).await {
        Ok(videos) => (
            StatusCode::OK,
            Json(json!({
                "count": videos.len(),
                "videos": videos,
            })),
        )
            .into_response(),
        Err(e) => lookup_failed("channel videos", e),
    }
}

/// GET /api/search/channel - Search channels by name
#[utoipa::path(
    get,
    path = "/api/search/channel",
    tag = "catalog",
    params(SearchQuery),
    responses(
        (status = 200, description = "`{channels, count, query}`"),
        (status = 400, description = "Missing query or search failed", body = crate::error::ApiError)
    )
)]
pub async fn search_channels(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let Some(q) = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
        return Error::Validation("Missing search query".into()).into_response();
    };
    let limit = parse_limit(query.limit.as_deref(), DEFAULT_SEARCH_LIMIT);

    match state.broker.catalog().search_channels(q, limit).await {
        Ok(channels) => (
            StatusCode::OK,
            Json(json!({
                "count": channels.len(),
                "channels": channels,
                "query": q,
            })),
        )
            .into_response(),
        Err(e) => lookup_failed("channel search", e),
    }
}

/// GET /api/cookies/status - Cookies file status
#[utoipa::path(
    get,
    path = "/api/cookies/status",
    tag = "catalog",
    responses(
        (status = 200, description = "Cookies file status", body = crate::types::CookiesStatus)
    )
)]
pub async fn cookies_status(State(state): State<AppState>) -> Response {
    (StatusCode::OK, Json(state.broker.cookies_status().await)).into_response()
}

// Lookups report every failure as a rejected request, keeping the error code.
fn lookup_failed(what: &str, error: Error) -> Response {
    tracing::warn!(error = %error, "Failed to look up {}", what);
    let status = match &error {
        Error::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_REQUEST,
    };
    let api_error: crate::error::ApiError = error.into();
    (status, Json(api_error)).into_response()
}
