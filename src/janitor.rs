//! Cache janitor
//!
//! Periodically removes artifact and metadata cache files older than the TTL
//! and evicts stale terminal tasks from the registry.
//!
//! Artifact files referenced by any task still in the registry are protected
//! and survive regardless of age. Metadata cache files have no owner and are
//! removed by age alone. The registry lock is only held while taking the
//! protected-path snapshot and while evicting, never during file system work.
//!
//! # Example
//!
//! ```no_run
//! use media_cache_broker::{janitor::Janitor, registry::TaskRegistry};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let janitor = Janitor::new(
//!     TaskRegistry::new(),
//!     "downloads".into(),
//!     "cache".into(),
//!     Duration::from_secs(12 * 3600),
//! );
//! let shutdown = CancellationToken::new();
//! tokio::spawn(janitor.run(Duration::from_secs(3600), shutdown.clone()));
//! # }
//! ```

use crate::registry::TaskRegistry;
use crate::types::CleanupReport;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Periodic TTL sweeper
#[derive(Clone)]
pub struct Janitor {
    registry: TaskRegistry,
    download_dir: PathBuf,
    cache_dir: PathBuf,
    ttl: Duration,
}

#[derive(Default)]
struct SweepStats {
    removed: usize,
    protected: usize,
    errors: usize,
}

impl Janitor {
    /// Create a janitor over the two storage directories
    pub fn new(registry: TaskRegistry, download_dir: PathBuf, cache_dir: PathBuf, ttl: Duration) -> Self {
        Self {
            registry,
            download_dir,
            cache_dir,
            ttl,
        }
    }

    /// Run one sweep
    pub async fn run_once(&self) -> CleanupReport {
        let mut protected = HashSet::new();
        for path in self.registry.protected_paths().await {
            // files already gone need no protection
            if let Ok(canonical) = tokio::fs::canonicalize(&path).await {
                protected.insert(canonical);
            }
        }

        let artifacts = self.sweep(&self.download_dir, Some(&protected)).await;
        let cache = self.sweep(&self.cache_dir, None).await;
        let tasks_evicted = self.registry.evict_expired_tasks(self.ttl).await;

        CleanupReport {
            files_removed: artifacts.removed,
            cache_files_removed: cache.removed,
            tasks_evicted,
            protected_paths: artifacts.protected,
            errors: artifacts.errors + cache.errors,
        }
    }

    /// Sweep every `interval` until `shutdown` fires
    pub async fn run(self, interval: Duration, shutdown: CancellationToken) {
        info!(
            interval_secs = interval.as_secs(),
            ttl_secs = self.ttl.as_secs(),
            "Cache janitor started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Cache janitor shutting down");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    let report = self.run_once().await;
                    info!(
                        files_removed = report.files_removed,
                        cache_files_removed = report.cache_files_removed,
                        tasks_evicted = report.tasks_evicted,
                        protected = report.protected_paths,
                        errors = report.errors,
                        "Cache sweep finished"
                    );
                }
            }
        }
    }

    async fn sweep(&self, dir: &Path, protected: Option<&HashSet<PathBuf>>) -> SweepStats {
        let mut stats = SweepStats::default();
        let now = SystemTime::now();

        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(dir = %dir.display(), error = %e, "Cannot read directory for sweep");
                    stats.errors += 1;
                }
                return stats;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Directory listing interrupted");
                    stats.errors += 1;
                    break;
                }
            };
            let path = entry.path();

            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot stat file");
                    stats.errors += 1;
                    continue;
                }
            };

            let expired = metadata
                .modified()
                .ok()
                .and_then(|m| now.duration_since(m).ok())
                .is_some_and(|age| age > self.ttl);
            if !expired {
                continue;
            }

            if let Some(protected) = protected {
                let canonical = tokio::fs::canonicalize(&path).await.unwrap_or_else(|_| path.clone());
                if protected.contains(&canonical) {
                    debug!(path = %path.display(), "Keeping expired file referenced by a task");
                    stats.protected += 1;
                    continue;
                }
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), "Removed expired file");
                    stats.removed += 1;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove expired file");
                    stats.errors += 1;
                }
            }
        }

        stats
    }
}
