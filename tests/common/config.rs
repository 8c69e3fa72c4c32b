//! Broker construction for integration tests

use super::fixtures::ScriptedFetcher;
use media_cache_broker::{Config, MediaBroker};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Config rooted in `root` with short grace periods and the janitor off
pub fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.storage.download_dir = root.join("downloads");
    config.storage.cache_dir = root.join("cache");
    config.janitor.enabled = false;
    config.tasks.cancel_grace_period = Duration::from_millis(200);
    config.tasks.shutdown_timeout = Duration::from_secs(2);
    config.fetcher.cookies_file = None;
    config
}

/// Broker around `fetcher` in a fresh temp dir (keep the TempDir alive)
pub async fn create_broker(fetcher: Arc<ScriptedFetcher>) -> (Arc<MediaBroker>, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let broker = MediaBroker::with_fetcher(test_config(temp_dir.path()), fetcher)
        .await
        .expect("Failed to create broker");
    (Arc::new(broker), temp_dir)
}
