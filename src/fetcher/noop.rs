//! No-op fetcher for graceful degradation

use super::traits::{ExtractOptions, FetchRequest, MediaFetcher, ProgressSender};
use async_trait::async_trait;

/// Fetcher used when no yt-dlp binary is available
///
/// Every operation returns `Error::NotSupported`, so downloads fail with a
/// clear message instead of the service refusing to start.
pub struct NoOpFetcher;

#[async_trait]
impl MediaFetcher for NoOpFetcher {
    async fn fetch(&self, _request: &FetchRequest, _progress: ProgressSender) -> crate::Result<()> {
        Err(crate::Error::NotSupported(
            "Downloads require the external yt-dlp binary. \
             Configure fetcher.ytdlp_path or ensure yt-dlp is in PATH."
                .into(),
        ))
    }

    async fn extract_info(
        &self,
        _url: &str,
        _options: &ExtractOptions,
    ) -> crate::Result<serde_json::Value> {
        Err(crate::Error::NotSupported(
            "Metadata lookups require the external yt-dlp binary. \
             Configure fetcher.ytdlp_path or ensure yt-dlp is in PATH."
                .into(),
        ))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
