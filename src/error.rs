//! Error types for media-cache-broker
//!
//! This module provides error handling for the library, including:
//! - Task state machine errors (unknown task, rejected transition)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use crate::types::TaskStatus;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for media-cache-broker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-cache-broker
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "storage.cache_ttl")
        key: Option<String>,
    },

    /// Missing or malformed request parameter
    #[error("validation error: {0}")]
    Validation(String),

    /// No task or file exists for the requested resource
    #[error("not found: {0}")]
    NotFound(String),

    /// Task registry error
    #[error("task error: {0}")]
    Task(#[from] TaskError),

    /// The media fetcher failed (network, extraction, unavailable media)
    ///
    /// The fetcher's own text is preserved verbatim for diagnostics.
    #[error("{0}")]
    Fetch(String),

    /// Rename or delete failed on an artifact or cache file
    #[error("storage error at {path}: {reason}")]
    Storage {
        /// File the operation was applied to
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// External tool execution failed (yt-dlp could not be launched, etc.)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing binary, not implemented, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Shutdown in progress - not accepting new downloads
    #[error("shutdown in progress: not accepting new downloads")]
    ShuttingDown,

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// Task registry errors
#[derive(Debug, Error)]
pub enum TaskError {
    /// No task is registered for the resource
    #[error("no task for resource {resource_id}")]
    NotFound {
        /// The resource ID that was looked up
        resource_id: String,
    },

    /// The task state machine rejected a transition
    #[error("cannot move task for {resource_id} from {from} to {to}")]
    InvalidTransition {
        /// Resource the task belongs to
        resource_id: String,
        /// Current state of the task
        from: TaskStatus,
        /// Requested state
        to: TaskStatus,
    },

    /// Fetch finished but no usable audio file materialized
    #[error("artifact missing or empty for {resource_id}")]
    ArtifactMissing {
        /// Resource whose artifact could not be resolved
        resource_id: String,
    },
}

/// API error response format
///
/// Returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "task_not_found",
///     "message": "task error: no task for resource abc123",
///     "details": {
///       "resource_id": "abc123"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::Validation(_) => 400,
            Error::Task(TaskError::InvalidTransition { .. }) => 400,
            // Metadata lookups report fetcher failures as a rejected request
            Error::Fetch(_) => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,
            Error::Task(TaskError::NotFound { .. }) => 404,
            Error::Task(TaskError::ArtifactMissing { .. }) => 404,

            // 500 Internal Server Error - Server-side issues
            Error::Storage { .. } => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
            Error::ExternalTool(_) => 503,

            // 501 Not Implemented - Feature not supported
            Error::NotSupported(_) => 501,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::NotFound(_) => "not_found",
            Error::Task(e) => match e {
                TaskError::NotFound { .. } => "task_not_found",
                TaskError::InvalidTransition { .. } => "invalid_transition",
                TaskError::ArtifactMissing { .. } => "artifact_missing",
            },
            Error::Fetch(_) => "fetch_error",
            Error::Storage { .. } => "storage_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ExternalTool(_) => "external_tool_error",
            Error::NotSupported(_) => "not_supported",
            Error::ShuttingDown => "shutting_down",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Task(TaskError::NotFound { resource_id })
            | Error::Task(TaskError::ArtifactMissing { resource_id }) => {
                Some(serde_json::json!({
                    "resource_id": resource_id,
                }))
            }
            Error::Task(TaskError::InvalidTransition {
                resource_id,
                from,
                to,
            }) => Some(serde_json::json!({
                "resource_id": resource_id,
                "from": from,
                "to": to,
            })),
            Error::Storage { path, .. } => Some(serde_json::json!({
                "path": path,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    /// Returns (Error, expected_status_code, expected_error_code) for every
    /// reachable match arm in ToHttpStatus.
    fn all_error_variants() -> Vec<(Error, u16, &'static str)> {
        vec![
            (
                Error::Config {
                    message: "ttl must be positive".into(),
                    key: Some("storage.cache_ttl".into()),
                },
                400,
                "config_error",
            ),
            (
                Error::Validation("missing id".into()),
                400,
                "validation_error",
            ),
            (
                Error::Task(TaskError::InvalidTransition {
                    resource_id: "abc".into(),
                    from: TaskStatus::Completed,
                    to: TaskStatus::Cancelled,
                }),
                400,
                "invalid_transition",
            ),
            (Error::Fetch("HTTP Error 403".into()), 400, "fetch_error"),
            (Error::NotFound("audio for abc".into()), 404, "not_found"),
            (
                Error::Task(TaskError::NotFound {
                    resource_id: "abc".into(),
                }),
                404,
                "task_not_found",
            ),
            (
                Error::Task(TaskError::ArtifactMissing {
                    resource_id: "abc".into(),
                }),
                404,
                "artifact_missing",
            ),
            (
                Error::Storage {
                    path: PathBuf::from("/tmp/x.webm"),
                    reason: "permission denied".into(),
                },
                500,
                "storage_error",
            ),
            (
                Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
                500,
                "io_error",
            ),
            (
                Error::Serialization(serde_json::from_str::<serde_json::Value>("{").unwrap_err()),
                500,
                "serialization_error",
            ),
            (
                Error::ApiServerError("bind failed".into()),
                500,
                "api_server_error",
            ),
            (Error::ShuttingDown, 503, "shutting_down"),
            (
                Error::ExternalTool("yt-dlp not executable".into()),
                503,
                "external_tool_error",
            ),
            (
                Error::NotSupported("no fetcher".into()),
                501,
                "not_supported",
            ),
        ]
    }

    #[test]
    fn every_variant_maps_to_expected_status_code() {
        for (error, expected_status, expected_code) in all_error_variants() {
            let actual_status = error.status_code();
            assert_eq!(
                actual_status, expected_status,
                "Error variant with error_code={expected_code} returned status {actual_status}, expected {expected_status}"
            );
        }
    }

    #[test]
    fn every_variant_maps_to_expected_error_code() {
        for (error, expected_status, expected_code) in all_error_variants() {
            let actual_code = error.error_code();
            assert_eq!(
                actual_code, expected_code,
                "Error variant with expected status={expected_status} returned error_code={actual_code}, expected {expected_code}"
            );
        }
    }

    #[test]
    fn invalid_transition_is_400_not_409() {
        let err = Error::Task(TaskError::InvalidTransition {
            resource_id: "abc".into(),
            from: TaskStatus::Failed,
            to: TaskStatus::Cancelled,
        });
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn api_error_from_invalid_transition_has_states() {
        let api: ApiError = Error::Task(TaskError::InvalidTransition {
            resource_id: "abc123".into(),
            from: TaskStatus::Completed,
            to: TaskStatus::Cancelled,
        })
        .into();

        let details = api.error.details.unwrap();
        assert_eq!(details["resource_id"], "abc123");
        assert_eq!(details["from"], "completed");
        assert_eq!(details["to"], "cancelled");
    }

    #[test]
    fn api_error_from_storage_has_path() {
        let api: ApiError = Error::Storage {
            path: PathBuf::from("/data/a.webm"),
            reason: "busy".into(),
        }
        .into();

        assert_eq!(api.error.code, "storage_error");
        assert!(
            api.error.details.unwrap()["path"]
                .as_str()
                .unwrap()
                .contains("a.webm")
        );
    }

    #[test]
    fn fetch_error_message_is_verbatim() {
        let err = Error::Fetch("ERROR: [youtube] abc: Video unavailable".into());
        assert_eq!(err.to_string(), "ERROR: [youtube] abc: Video unavailable");

        let api: ApiError = err.into();
        assert_eq!(api.error.message, "ERROR: [youtube] abc: Video unavailable");
        assert!(api.error.details.is_none());
    }

    #[test]
    fn api_error_without_details_omits_details_in_json() {
        let api = ApiError::validation("missing id");
        let json = serde_json::to_value(&api).unwrap();
        assert_eq!(json["error"]["code"], "validation_error");
        assert!(json["error"].get("details").is_none());
    }

    #[test]
    fn api_error_factories_use_expected_codes() {
        assert_eq!(ApiError::not_found("task").error.code, "not_found");
        assert_eq!(ApiError::not_found("task").error.message, "task not found");
        assert_eq!(ApiError::internal("x").error.code, "internal_error");
    }
}
