//! Download start, status and cancellation handlers.

use super::IdQuery;
use crate::api::AppState;
use crate::broker::DownloadOutcome;
use crate::error::{Error, TaskError};
use crate::types::TaskSnapshot;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// POST /download - Start a download, or join the one in progress
#[utoipa::path(
    post,
    path = "/download",
    tag = "downloads",
    params(IdQuery),
    responses(
        (status = 200, description = "Task created, running, or already cached"),
        (status = 400, description = "Missing or invalid id", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn start_download(State(state): State<AppState>, Query(query): Query<IdQuery>) -> Response {
    let id = match query.require() {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match state.broker.request_download(id).await {
        Ok(ticket) => {
            let task = &ticket.task;
            let body = match ticket.outcome {
                DownloadOutcome::AlreadyCached => json!({
                    "task_id": task.id,
                    "status": task.status,
                    "message": task.message,
                    "files_ready": true,
                }),
                DownloadOutcome::Existing => json!({
                    "task_id": task.id,
                    "status": task.status,
                    "message": "Task already in progress",
                }),
                DownloadOutcome::Spawned => json!({
                    "task_id": task.id,
                    "status": task.status,
                    "message": task.message,
                }),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// GET /status - Task snapshot for a resource
#[utoipa::path(
    get,
    path = "/status",
    tag = "downloads",
    params(IdQuery),
    responses(
        (status = 200, description = "Task snapshot", body = TaskSnapshot),
        (status = 400, description = "Missing id", body = crate::error::ApiError),
        (status = 404, description = "No task for this resource", body = crate::error::ApiError)
    )
)]
pub async fn get_status(State(state): State<AppState>, Query(query): Query<IdQuery>) -> Response {
    let id = match query.require() {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match state.broker.status(id).await {
        Ok(task) => (StatusCode::OK, Json(TaskSnapshot::from(&task))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// DELETE /cancel - Cancel a live task
#[utoipa::path(
    delete,
    path = "/cancel",
    tag = "downloads",
    params(IdQuery),
    responses(
        (status = 200, description = "Task cancelled"),
        (status = 400, description = "Missing id, or task already finished"),
        (status = 404, description = "No task for this resource", body = crate::error::ApiError)
    )
)]
pub async fn cancel_download(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Response {
    let id = match query.require() {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match state.broker.cancel(id).await {
        Ok(task) => (
            StatusCode::OK,
            Json(json!({
                "message": "Task cancelled",
                "status": task.status,
            })),
        )
            .into_response(),
        Err(Error::Task(TaskError::InvalidTransition { from, .. })) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "message": format!("Cannot cancel task in status: {from}"),
                "status": from,
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
