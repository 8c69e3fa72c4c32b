//! Traits and types for media fetching

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Progress event emitted by a fetcher while it downloads
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FetchProgress {
    /// Bytes received so far, with the total when the source reports it
    Downloading {
        /// Bytes downloaded
        downloaded_bytes: u64,
        /// Expected size, if known
        total_bytes: Option<u64>,
    },
    /// The transfer finished; post-processing may still follow
    Finished,
}

/// Channel a fetcher reports progress on
pub type ProgressSender = mpsc::UnboundedSender<FetchProgress>;

/// A single download request
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Page URL of the media
    pub url: String,
    /// Extension-less output path; the fetcher appends its own extension
    pub output_base: PathBuf,
    /// Subtitle languages to write alongside the audio
    pub subtitle_langs: Vec<String>,
}

/// Options for metadata extraction
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// List playlist entries without resolving each one
    pub flat: bool,
    /// Playlist item selection, e.g. `"1:5"`
    pub playlist_items: Option<String>,
}

impl ExtractOptions {
    /// Full extraction of a single item
    pub fn detailed() -> Self {
        Self::default()
    }

    /// Flat listing limited to `items`
    pub fn flat(items: impl Into<String>) -> Self {
        Self {
            flat: true,
            playlist_items: Some(items.into()),
        }
    }
}

/// Trait for media retrieval
///
/// Implementations download audio and subtitles for a page URL and extract
/// JSON info documents. The production implementation drives an external
/// binary; tests substitute scripted fetchers.
///
/// # Examples
///
/// ```no_run
/// use media_cache_broker::fetcher::{ExtractOptions, MediaFetcher, YtDlpFetcher};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = YtDlpFetcher::from_path().expect("yt-dlp not found in PATH");
/// let info = fetcher
///     .extract_info("https://www.youtube.com/watch?v=dQw4w9WgXcQ", &ExtractOptions::detailed())
///     .await?;
/// println!("{}", info["title"]);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Download the media described by `request`
    ///
    /// Progress is reported on `progress` as the transfer runs. The call
    /// returns once the fetcher has exited; output files are located by the
    /// caller afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`](crate::Error::Fetch) with the fetcher's own
    /// diagnostic text when retrieval fails, or
    /// [`Error::ExternalTool`](crate::Error::ExternalTool) when the fetcher
    /// cannot be started.
    async fn fetch(&self, request: &FetchRequest, progress: ProgressSender) -> crate::Result<()>;

    /// Extract the JSON info document for a URL without downloading
    async fn extract_info(
        &self,
        url: &str,
        options: &ExtractOptions,
    ) -> crate::Result<serde_json::Value>;

    /// Human-readable name for logging and the health report
    fn name(&self) -> &'static str;
}
