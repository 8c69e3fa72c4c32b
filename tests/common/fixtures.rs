//! Scripted media fetcher and canned metadata

use async_trait::async_trait;
use media_cache_broker::fetcher::{
    ExtractOptions, FetchProgress, FetchRequest, MediaFetcher, ProgressSender,
};
use media_cache_broker::{Error, Result};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Info document returned for every lookup
pub fn video_info_json() -> Value {
    json!({
        "title": "Integration Video",
        "duration": 95,
        "uploader": "Tester",
        "channel_id": "UCabcdefghijklmnopqrstuv",
        "channel": "Test Channel",
        "view_count": 42
    })
}

/// Fetcher that writes canned artifacts next to the requested output base
pub struct ScriptedFetcher {
    /// Suffixes written on success, each with its contents
    pub outputs: Vec<(String, Vec<u8>)>,
    /// Progress events replayed before writing
    pub events: Vec<FetchProgress>,
    /// Blocks each fetch until fired
    pub hold: Option<CancellationToken>,
    /// Extra delay per fetch
    pub delay: Duration,
    /// Number of fetch calls started
    pub fetches: AtomicUsize,
    /// Peak number of fetches running at once
    pub peak_in_flight: AtomicUsize,
    pub in_flight: AtomicUsize,
}

impl Default for ScriptedFetcher {
    fn default() -> Self {
        Self {
            outputs: vec![
                (".m4a".to_string(), b"m4a-audio".to_vec()),
                (".en.vtt".to_string(), b"WEBVTT\n".to_vec()),
            ],
            events: vec![
                FetchProgress::Downloading {
                    downloaded_bytes: 25,
                    total_bytes: Some(100),
                },
                FetchProgress::Downloading {
                    downloaded_bytes: 75,
                    total_bytes: Some(100),
                },
                FetchProgress::Finished,
            ],
            hold: None,
            delay: Duration::ZERO,
            fetches: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }
}

impl ScriptedFetcher {
    /// Fetcher whose fetches block until `hold` fires
    pub fn held(hold: CancellationToken) -> Self {
        Self {
            hold: Some(hold),
            ..Default::default()
        }
    }

    /// Number of fetch calls started
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaFetcher for ScriptedFetcher {
    async fn fetch(&self, request: &FetchRequest, progress: ProgressSender) -> Result<()> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(hold) = &self.hold {
            hold.cancelled().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        for event in &self.events {
            let _ = progress.send(*event);
        }

        let mut result = Ok(());
        for (suffix, contents) in &self.outputs {
            let mut path = request.output_base.as_os_str().to_owned();
            path.push(suffix);
            if let Err(e) = tokio::fs::write(PathBuf::from(path), contents).await {
                result = Err(Error::Io(e));
                break;
            }
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn extract_info(&self, _url: &str, _options: &ExtractOptions) -> Result<Value> {
        Ok(video_info_json())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
