//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`downloads`] — Download start, status and cancellation
//! - [`files`] — Artifact serving
//! - [`catalog`] — Video and channel metadata lookups
//! - [`system`] — Health, index, diagnostics, OpenAPI

use crate::error::Error;
use serde::{Deserialize, Serialize};

mod catalog;
mod downloads;
mod files;
mod system;

pub use catalog::*;
pub use downloads::*;
pub use files::*;
pub use system::*;

/// Default `limit` for `GET /api/channel/videos`
pub const DEFAULT_CHANNEL_VIDEOS_LIMIT: usize = 20;

/// Default `limit` for `GET /api/search/channel`
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

// ============================================================================
// Query Types (shared across handlers)
// ============================================================================

/// Query parameters carrying a resource or channel identifier
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema, utoipa::IntoParams)]
pub struct IdQuery {
    /// Resource (video) or channel identifier
    pub id: Option<String>,
}

impl IdQuery {
    /// The identifier, or a validation error when absent or blank
    pub fn require(&self) -> Result<&str, Error> {
        self.id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::Validation("Missing video id".into()))
    }
}

/// Query parameters for `GET /api/channel/videos`
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema, utoipa::IntoParams)]
pub struct ChannelVideosQuery {
    /// Channel identifier (`@handle`, `UC...` ID, or name)
    pub id: Option<String>,
    /// Number of videos (default 20, clamped to 1..=50)
    pub limit: Option<String>,
}

/// Query parameters for `GET /api/search/channel`
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema, utoipa::IntoParams)]
pub struct SearchQuery {
    /// Search text
    pub q: Option<String>,
    /// Number of results (default 10, clamped to 1..=20)
    pub limit: Option<String>,
}

/// Parse a `limit` parameter, falling back to `default` when absent or not a number
pub(crate) fn parse_limit(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .map(|n| n.max(0) as usize)
        .unwrap_or(default)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_parsing_falls_back_on_garbage() {
        assert_eq!(parse_limit(None, 20), 20);
        assert_eq!(parse_limit(Some("abc"), 20), 20);
        assert_eq!(parse_limit(Some("7"), 20), 7);
        assert_eq!(parse_limit(Some("-3"), 20), 0);
    }

    #[test]
    fn id_query_rejects_blank() {
        let query = IdQuery {
            id: Some("  ".into()),
        };
        assert!(matches!(query.require(), Err(Error::Validation(_))));
        let query = IdQuery { id: None };
        assert!(query.require().is_err());
        let query = IdQuery {
            id: Some("abc123".into()),
        };
        assert_eq!(query.require().unwrap(), "abc123");
    }
}
