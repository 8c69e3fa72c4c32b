//! Shared test helpers for creating MediaBroker instances in tests.

use crate::broker::MediaBroker;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::{ExtractOptions, FetchProgress, FetchRequest, MediaFetcher, ProgressSender};
use crate::types::{Task, TaskStatus};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

/// In-process fetcher that writes canned files and replays canned progress
pub(crate) struct ScriptedFetcher {
    /// Info document returned by extract_info; None makes it fail
    pub(crate) info: Option<Value>,
    /// Files written next to the output base: (suffix, contents)
    pub(crate) outputs: Vec<(String, Vec<u8>)>,
    /// Progress events sent before the files are written
    pub(crate) events: Vec<FetchProgress>,
    /// Fail the fetch with this text instead of writing files
    pub(crate) fail_with: Option<String>,
    /// When set, fetch blocks until the token fires
    pub(crate) hold: Option<CancellationToken>,
    pub(crate) fetch_calls: AtomicUsize,
    pub(crate) info_calls: AtomicUsize,
}

impl Default for ScriptedFetcher {
    fn default() -> Self {
        Self {
            info: Some(json!({"title": "Test Video", "duration": 212, "channel_id": "UC1"})),
            outputs: vec![
                (".webm".to_string(), b"audio-bytes".to_vec()),
                (".en.vtt".to_string(), b"WEBVTT\n\n00:00.000 --> 00:01.000\nhi\n".to_vec()),
            ],
            events: vec![
                FetchProgress::Downloading {
                    downloaded_bytes: 50,
                    total_bytes: Some(100),
                },
                FetchProgress::Finished,
            ],
            fail_with: None,
            hold: None,
            fetch_calls: AtomicUsize::new(0),
            info_calls: AtomicUsize::new(0),
        }
    }
}

impl ScriptedFetcher {
    pub(crate) fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaFetcher for ScriptedFetcher {
    async fn fetch(&self, request: &FetchRequest, progress: ProgressSender) -> Result<()> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(hold) = &self.hold {
            hold.cancelled().await;
        }
        for event in &self.events {
            let _ = progress.send(*event);
        }
        if let Some(error) = &self.fail_with {
            return Err(Error::Fetch(error.clone()));
        }

        for (suffix, contents) in &self.outputs {
            let mut path = request.output_base.as_os_str().to_owned();
            path.push(suffix);
            tokio::fs::write(std::path::PathBuf::from(path), contents).await?;
        }
        Ok(())
    }

    async fn extract_info(&self, _url: &str, _options: &ExtractOptions) -> Result<Value> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        self.info
            .clone()
            .ok_or_else(|| Error::Fetch("ERROR: [youtube] Video unavailable".into()))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Config rooted in a temp dir with short grace periods and no janitor
pub(crate) fn test_config(root: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.storage.download_dir = root.join("downloads");
    config.storage.cache_dir = root.join("cache");
    config.janitor.enabled = false;
    config.tasks.cancel_grace_period = Duration::from_millis(200);
    config.tasks.shutdown_timeout = Duration::from_secs(2);
    config.fetcher.cookies_file = None;
    config
}

/// Helper to create a test MediaBroker around a scripted fetcher.
/// Returns the broker and the tempdir (which must be kept alive).
pub(crate) async fn create_test_broker(
    fetcher: Arc<ScriptedFetcher>,
) -> (MediaBroker, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let broker = MediaBroker::with_fetcher(test_config(temp_dir.path()), fetcher)
        .await
        .unwrap();
    (broker, temp_dir)
}

/// Poll until the task reaches `status` or five seconds pass
pub(crate) async fn wait_for_status(broker: &MediaBroker, id: &str, status: TaskStatus) -> Task {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(task) = broker.status(id).await
                && task.status == status
            {
                return task;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("task {id} never reached {status}"))
}

/// Poll until no worker is attached to any task
pub(crate) async fn wait_for_idle(broker: &MediaBroker) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while broker.registry().worker_count().await > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}
