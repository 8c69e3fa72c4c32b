//! Typed metadata lookups backed by the metadata cache
//!
//! Every lookup goes through [`MetadataCache`] under its own cache type, so
//! repeated requests within the TTL never reach the fetcher.

use crate::error::{Error, Result};
use crate::fetcher::parser::{
    channel_info_from_json, channel_search_from_json, video_info_from_json,
    video_summaries_from_json,
};
use crate::fetcher::{ExtractOptions, MediaFetcher, watch_url};
use crate::metadata_cache::MetadataCache;
use crate::paths::PathResolver;
use crate::types::{ArtifactKind, ChannelInfo, ChannelSearchResult, VideoInfo, VideoSummary};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cache type for detailed video documents
pub const VIDEO_DETAILED: &str = "video_detailed";
/// Cache type for channel handle resolution
pub const CHANNEL_RESOLVE: &str = "channel_resolve";
/// Cache type for channel documents
pub const CHANNEL_INFO: &str = "channel_info";
/// Cache type for channel video listings
pub const CHANNEL_VIDEOS: &str = "channel_videos";
/// Cache type for channel searches
pub const SEARCH_CHANNELS: &str = "search_channels";

/// Allowed range for channel video listings
pub const CHANNEL_VIDEOS_LIMIT: (usize, usize) = (1, 50);
/// Allowed range for channel searches
pub const SEARCH_LIMIT: (usize, usize) = (1, 20);

const CHANNEL_ID_LEN: usize = 24;

#[derive(Serialize, Deserialize)]
struct ResolvedChannel {
    channel_id: String,
    resolved_from: String,
}

/// Metadata lookups for videos and channels
#[derive(Clone)]
pub struct Catalog {
    cache: MetadataCache,
    fetcher: Arc<dyn MediaFetcher>,
    paths: PathResolver,
}

impl Catalog {
    /// Create a catalog over a cache, a fetcher and the artifact directory
    pub fn new(cache: MetadataCache, fetcher: Arc<dyn MediaFetcher>, paths: PathResolver) -> Self {
        Self {
            cache,
            fetcher,
            paths,
        }
    }

    /// Detailed information for a single video
    pub async fn video_info(&self, video_id: &str) -> Result<VideoInfo> {
        let fetcher = self.fetcher.clone();
        self.cache
            .get_default(VIDEO_DETAILED, video_id, || async move {
                tracing::info!(video_id = %video_id, "Fetching video info");
                let info = fetcher
                    .extract_info(&watch_url(video_id), &ExtractOptions::detailed())
                    .await?;
                Ok(video_info_from_json(video_id, &info))
            })
            .await
    }

    /// Video info for a download task, stored next to its artifacts
    ///
    /// Reads the artifact info file first. On a miss the document comes from
    /// [`video_info`](Self::video_info) and is written back; a failed write is
    /// logged and ignored.
    pub async fn task_video_info(&self, video_id: &str) -> Result<VideoInfo> {
        let info_path = self.paths.canonical_path(video_id, ArtifactKind::Metadata);

        if let Some(info) = read_info_file(&info_path).await {
            return Ok(info);
        }

        let info = self.video_info(video_id).await?;

        match serde_json::to_vec_pretty(&info) {
            Ok(bytes) => {
                if let Err(e) = tokio::fs::write(&info_path, bytes).await {
                    tracing::warn!(
                        video_id = %video_id,
                        path = %info_path.display(),
                        error = %e,
                        "Failed to write video info file"
                    );
                }
            }
            Err(e) => tracing::warn!(video_id = %video_id, error = %e, "Failed to encode video info"),
        }

        Ok(info)
    }

    /// Artifact info file for a video, if present and readable
    pub async fn stored_video_info(&self, video_id: &str) -> Option<VideoInfo> {
        read_info_file(&self.paths.canonical_path(video_id, ArtifactKind::Metadata)).await
    }

    /// Resolve a channel handle, custom URL name, user name or ID to a channel ID
    pub async fn resolve_channel_id(&self, input: &str) -> Result<String> {
        let input = input.trim().trim_start_matches('@');
        if input.is_empty() {
            return Err(Error::Validation("channel identifier is empty".into()));
        }
        if input.starts_with("UC") && input.len() == CHANNEL_ID_LEN {
            return Ok(input.to_string());
        }

        let fetcher = self.fetcher.clone();
        let resolved: ResolvedChannel = self
            .cache
            .get_default(CHANNEL_RESOLVE, input, || async move {
                let encoded = urlencoding::encode(input);
                let candidates = [
                    format!("https://www.youtube.com/@{encoded}"),
                    format!("https://www.youtube.com/c/{encoded}"),
                    format!("https://www.youtube.com/user/{encoded}"),
                    format!("https://www.youtube.com/channel/{encoded}"),
                ];

                for url in candidates {
                    match fetcher.extract_info(&url, &ExtractOptions::flat("1")).await {
                        Ok(info) => {
                            if let Some(channel_id) = info
                                .get("channel_id")
                                .and_then(|v| v.as_str())
                                .filter(|s| !s.is_empty())
                            {
                                tracing::info!(input = %input, channel_id = %channel_id, "Resolved channel");
                                return Ok(ResolvedChannel {
                                    channel_id: channel_id.to_string(),
                                    resolved_from: url,
                                });
                            }
                        }
                        Err(e) => {
                            tracing::debug!(url = %url, error = %e, "Channel probe failed");
                        }
                    }
                }

                Err(Error::Fetch(format!(
                    "channel not found or inaccessible: {input}"
                )))
            })
            .await?;

        Ok(resolved.channel_id)
    }

    /// Channel information
    pub async fn channel_info(&self, input: &str) -> Result<ChannelInfo> {
        let channel_id = self.resolve_channel_id(input).await?;
        let fetcher = self.fetcher.clone();
        let id = channel_id.as_str();

        self.cache
            .get_default(CHANNEL_INFO, id, || async move {
                let url = format!("https://www.youtube.com/channel/{id}/videos");
                let info = fetcher
                    .extract_info(&url, &ExtractOptions::flat("1:5"))
                    .await?;
                Ok(channel_info_from_json(id, &info))
            })
            .await
    }

    /// Latest videos of a channel; `limit` is clamped to 1..=50
    pub async fn channel_videos(&self, input: &str, limit: usize) -> Result<Vec<VideoSummary>> {
        let limit = limit.clamp(CHANNEL_VIDEOS_LIMIT.0, CHANNEL_VIDEOS_LIMIT.1);
        let channel_id = self.resolve_channel_id(input).await?;
        let fetcher = self.fetcher.clone();
        let id = channel_id.as_str();
        let key = format!("{channel_id}_{limit}");

        self.cache
            .get_default(CHANNEL_VIDEOS, &key, || async move {
                let url = format!("https://www.youtube.com/channel/{id}/videos");
                let info = fetcher
                    .extract_info(&url, &ExtractOptions::flat(format!("1:{limit}")))
                    .await?;
                Ok(video_summaries_from_json(&info, limit))
            })
            .await
    }

    /// Search for channels; `limit` is clamped to 1..=20
    pub async fn search_channels(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ChannelSearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::Validation("missing search query".into()));
        }
        let limit = limit.clamp(SEARCH_LIMIT.0, SEARCH_LIMIT.1);
        let fetcher = self.fetcher.clone();
        let key = format!("{query}_{limit}");

        self.cache
            .get_default(SEARCH_CHANNELS, &key, || async move {
                let search = format!("ytsearch{limit}:\"{query}\" channel");
                let info = fetcher
                    .extract_info(&search, &ExtractOptions::flat(format!("1:{limit}")))
                    .await?;
                Ok(channel_search_from_json(&info))
            })
            .await
    }
}

async fn read_info_file(path: &std::path::Path) -> Option<VideoInfo> {
    let bytes = tokio::fs::read(path).await.ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(info) => Some(info),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Unreadable video info file");
            None
        }
    }
}
