//! Read-through JSON cache for metadata lookups
//!
//! Entries live as one JSON file each in the cache directory. Freshness is the
//! file's modification time: an entry is valid while `now - mtime < ttl`.
//! Producer errors are returned to the caller and never written.

use crate::error::Result;
use crate::paths::hash_prefix;
use serde::{Serialize, de::DeserializeOwned};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

const MAX_SANITIZED_LEN: usize = 100;

/// TTL-gated read-through cache backed by JSON files
#[derive(Clone, Debug)]
pub struct MetadataCache {
    cache_dir: PathBuf,
    default_ttl: Duration,
}

impl MetadataCache {
    /// Create a cache rooted at `cache_dir`
    pub fn new(cache_dir: impl Into<PathBuf>, default_ttl: Duration) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            default_ttl,
        }
    }

    /// File backing `(cache_type, identifier)`
    ///
    /// `{cache_type}_{hash12}_{sanitized}.json`, where the hash is taken over
    /// the raw identifier so sanitizing can never make two keys collide.
    pub fn cache_path(&self, cache_type: &str, identifier: &str) -> PathBuf {
        let sanitized: String = identifier
            .replace(['/', '\\'], "_")
            .chars()
            .take(MAX_SANITIZED_LEN)
            .collect();
        self.cache_dir.join(format!(
            "{}_{}_{}.json",
            cache_type,
            hash_prefix(identifier),
            sanitized
        ))
    }

    /// Whether `path` exists and was written less than `ttl` ago
    pub async fn is_valid(&self, path: &Path, ttl: Duration) -> bool {
        let modified = match tokio::fs::metadata(path).await.and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => return false,
        };

        match SystemTime::now().duration_since(modified) {
            Ok(age) => age < ttl,
            // mtime in the future: treat as just written
            Err(_) => true,
        }
    }

    /// Serve a fresh entry or run `producer` and persist its value
    pub async fn get<T, F, Fut>(
        &self,
        cache_type: &str,
        identifier: &str,
        ttl: Duration,
        producer: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let path = self.cache_path(cache_type, identifier);

        if self.is_valid(&path, ttl).await {
            match read_entry::<T>(&path).await {
                Ok(value) => {
                    tracing::debug!(
                        cache_type = %cache_type,
                        identifier = %identifier,
                        "Metadata cache hit"
                    );
                    return Ok(value);
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Corrupt metadata cache entry, refetching"
                    );
                }
            }
        }

        tracing::debug!(
            cache_type = %cache_type,
            identifier = %identifier,
            "Metadata cache miss"
        );
        let value = producer().await?;

        if let Err(e) = self.write_entry(&path, &value).await {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to persist metadata cache entry"
            );
        }

        Ok(value)
    }

    /// [`get`](Self::get) with the configured TTL
    pub async fn get_default<T, F, Fut>(
        &self,
        cache_type: &str,
        identifier: &str,
        producer: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.get(cache_type, identifier, self.default_ttl, producer)
            .await
    }

    async fn write_entry<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;

        let bytes = serde_json::to_vec_pretty(value)?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

async fn read_entry<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn counting_producer(
        calls: &Arc<AtomicUsize>,
        value: &'static str,
    ) -> impl FnOnce() -> std::future::Ready<Result<String>> {
        let calls = calls.clone();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(value.to_string()))
        }
    }

    #[test]
    fn cache_path_hashes_and_sanitizes() {
        let cache = MetadataCache::new("/c", Duration::from_secs(60));
        let path = cache.cache_path("channel_videos", "UCabc/x\\y_10");

        let name = path.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("channel_videos_"));
        assert!(name.ends_with("_UCabc_x_y_10.json"));
        assert!(name.contains(&hash_prefix("UCabc/x\\y_10")));
    }

    #[test]
    fn cache_path_truncates_long_identifiers() {
        let cache = MetadataCache::new("/c", Duration::from_secs(60));
        let long = "q".repeat(300);
        let name = cache
            .cache_path("search_channels", &long)
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();

        // "search_channels_" + 12 hex + "_" + 100 chars + ".json"
        assert_eq!(name.len(), 16 + 12 + 1 + 100 + 5);
    }

    #[tokio::test]
    async fn producer_runs_once_within_ttl() {
        let dir = tempdir().unwrap();
        let cache = MetadataCache::new(dir.path(), Duration::from_secs(3600));
        let calls = Arc::new(AtomicUsize::new(0));

        let first: String = cache
            .get_default("video_detailed", "abc123", counting_producer(&calls, "one"))
            .await
            .unwrap();
        let second: String = cache
            .get_default("video_detailed", "abc123", counting_producer(&calls, "two"))
            .await
            .unwrap();

        assert_eq!(first, "one");
        assert_eq!(second, "one");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn producer_runs_again_after_expiry() {
        let dir = tempdir().unwrap();
        let cache = MetadataCache::new(dir.path(), Duration::from_secs(3600));
        let calls = Arc::new(AtomicUsize::new(0));

        let _: String = cache
            .get("video_detailed", "abc123", Duration::from_millis(50), counting_producer(&calls, "one"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        let refreshed: String = cache
            .get("video_detailed", "abc123", Duration::from_millis(50), counting_producer(&calls, "two"))
            .await
            .unwrap();

        assert_eq!(refreshed, "two");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let dir = tempdir().unwrap();
        let cache = MetadataCache::new(dir.path(), Duration::from_secs(3600));

        let failed: Result<String> = cache
            .get_default("video_detailed", "abc123", || async {
                Err(Error::Fetch("ERROR: Video unavailable".into()))
            })
            .await;
        assert!(matches!(failed, Err(Error::Fetch(_))));
        assert!(!cache.cache_path("video_detailed", "abc123").exists());

        let calls = Arc::new(AtomicUsize::new(0));
        let value: String = cache
            .get_default("video_detailed", "abc123", counting_producer(&calls, "ok"))
            .await
            .unwrap();
        assert_eq!(value, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn corrupt_entry_is_a_miss() {
        let dir = tempdir().unwrap();
        let cache = MetadataCache::new(dir.path(), Duration::from_secs(3600));
        let path = cache.cache_path("channel_info", "UCx");
        std::fs::write(&path, b"{not json").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let value: String = cache
            .get_default("channel_info", "UCx", counting_producer(&calls, "fresh"))
            .await
            .unwrap();

        assert_eq!(value, "fresh");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stored: String = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(stored, "fresh");
    }

    #[tokio::test]
    async fn unwritable_cache_still_returns_value() {
        let dir = tempdir().unwrap();
        // a regular file where the cache directory should be
        let blocker = dir.path().join("cache");
        std::fs::write(&blocker, b"x").unwrap();
        let cache = MetadataCache::new(&blocker, Duration::from_secs(3600));

        let value: String = cache
            .get_default("video_detailed", "abc123", || async { Ok("v".to_string()) })
            .await
            .unwrap();
        assert_eq!(value, "v");
    }

    #[tokio::test]
    async fn is_valid_false_for_missing_file() {
        let dir = tempdir().unwrap();
        let cache = MetadataCache::new(dir.path(), Duration::from_secs(3600));
        assert!(
            !cache
                .is_valid(&dir.path().join("nope.json"), Duration::from_secs(60))
                .await
        );
    }
}
