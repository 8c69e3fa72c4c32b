//! Cache expiry against live and finished tasks

mod common;

use common::{ScriptedFetcher, create_broker, test_config, wait_for_idle, wait_for_status};
use media_cache_broker::{ArtifactKind, MediaBroker, TaskStatus};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

fn age(path: &Path, by: Duration) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - by).unwrap();
}

#[tokio::test]
async fn expired_artifacts_of_known_tasks_survive_until_eviction() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let (broker, _temp_dir) = create_broker(fetcher).await;

    broker.request_download("abc123").await.unwrap();
    let task = wait_for_status(&broker, "abc123", TaskStatus::Completed, Duration::from_secs(5)).await;
    wait_for_idle(&broker, Duration::from_secs(5)).await;
    let audio = task.audio_path.unwrap();

    let stray = broker.paths().canonical_path("zzz999", ArtifactKind::Audio);
    std::fs::write(&stray, b"old").unwrap();

    let day = Duration::from_secs(24 * 60 * 60);
    age(&audio, day);
    age(&stray, day);

    let report = broker.cleanup_now().await;

    // the completed task is younger than the TTL, so its files stay protected
    assert!(audio.exists());
    assert!(!stray.exists());
    assert_eq!(report.files_removed, 1);
    assert!(report.protected_paths >= 1);
    assert_eq!(report.tasks_evicted, 0);
}

#[tokio::test]
async fn old_cache_entries_are_deleted_by_age() {
    let temp_dir = tempfile::tempdir().unwrap();
    let broker = MediaBroker::with_fetcher(
        test_config(temp_dir.path()),
        Arc::new(ScriptedFetcher::default()),
    )
    .await
    .unwrap();

    broker.catalog().video_info("abc123").await.unwrap();
    let cache_dir = &broker.config().storage.cache_dir;
    let entries: Vec<_> = std::fs::read_dir(cache_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(entries.len(), 1);

    let fresh = broker.cleanup_now().await;
    assert_eq!(fresh.cache_files_removed, 0);

    age(&entries[0], Duration::from_secs(13 * 60 * 60));
    let expired = broker.cleanup_now().await;
    assert_eq!(expired.cache_files_removed, 1);
    assert!(!entries[0].exists());
}
