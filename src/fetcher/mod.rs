//! Media fetching
//!
//! The broker never talks to a media source directly. Retrieval sits behind
//! the [`MediaFetcher`] trait:
//!
//! - [`YtDlpFetcher`]: runs the external `yt-dlp` binary
//! - [`NoOpFetcher`]: stub used when no binary is available
//!
//! Tests and embedders can supply their own implementation through
//! [`MediaBroker::with_fetcher`](crate::MediaBroker::with_fetcher).

mod cli;
mod noop;
pub mod parser;
mod traits;

pub use cli::YtDlpFetcher;
pub use noop::NoOpFetcher;
pub use traits::{ExtractOptions, FetchProgress, FetchRequest, MediaFetcher, ProgressSender};

/// Page URL for a video ID
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}
