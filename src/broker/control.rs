//! Download requests, status and cancellation.

use crate::error::{Error, Result, TaskError};
use crate::paths::validate_resource_id;
use crate::registry::CreateOutcome;
use crate::types::{ExistingArtifacts, Task};
use crate::worker::{WorkerContext, run_download_task};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::MediaBroker;

const WORKER_EXIT_POLL: Duration = Duration::from_millis(50);

/// How a download request was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// A task for the resource was already running
    Existing,
    /// Artifacts were already on disk
    AlreadyCached,
    /// A new worker was spawned
    Spawned,
}

/// Answer to [`MediaBroker::request_download`]
#[derive(Debug, Clone)]
pub struct DownloadTicket {
    /// Task snapshot at the time of the request
    pub task: Task,
    /// How the request was satisfied
    pub outcome: DownloadOutcome,
    /// Whether the artifacts can be fetched right away
    pub files_ready: bool,
}

impl MediaBroker {
    /// Request the artifacts for a resource
    ///
    /// Returns a completed task immediately when the artifacts are already on
    /// disk, the running task when one exists, and otherwise a fresh pending
    /// task with a worker spawned for it.
    ///
    /// Workers are not pooled: every distinct resource gets its own tokio task.
    pub async fn request_download(&self, resource_id: &str) -> Result<DownloadTicket> {
        validate_resource_id(resource_id)?;

        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let on_disk = self.existing_artifacts(resource_id).await;
        let outcome = self.registry.get_or_create(resource_id, on_disk).await;

        let ticket = match outcome {
            CreateOutcome::Existing(task) => {
                tracing::info!(resource_id = %resource_id, status = %task.status, "Task already in progress");
                DownloadTicket {
                    task,
                    outcome: DownloadOutcome::Existing,
                    files_ready: false,
                }
            }
            CreateOutcome::AlreadyCached(task) => {
                tracing::info!(resource_id = %resource_id, "Artifacts already cached");
                DownloadTicket {
                    task,
                    outcome: DownloadOutcome::AlreadyCached,
                    files_ready: true,
                }
            }
            CreateOutcome::SpawnRequired { task, token } => {
                self.spawn_worker(&task, token);
                tracing::info!(resource_id = %resource_id, task_id = %task.id, "Download task started");
                DownloadTicket {
                    task,
                    outcome: DownloadOutcome::Spawned,
                    files_ready: false,
                }
            }
        };

        Ok(ticket)
    }

    /// Current task for a resource
    pub async fn status(&self, resource_id: &str) -> Result<Task> {
        self.registry.get(resource_id).await.ok_or_else(|| {
            Error::Task(TaskError::NotFound {
                resource_id: resource_id.to_string(),
            })
        })
    }

    /// Cancel the live task for a resource
    ///
    /// After the registry records the cancellation, waits up to
    /// `tasks.cancel_grace_period` for the worker to exit. The returned task
    /// is the cancelled snapshot whether or not the worker exited in time.
    pub async fn cancel(&self, resource_id: &str) -> Result<Task> {
        let task = self.registry.cancel(resource_id).await?;
        tracing::info!(resource_id = %resource_id, "Download task cancelled");

        let grace = self.config.tasks.cancel_grace_period;
        let waited = tokio::time::timeout(grace, async {
            while self.registry.has_worker(resource_id, task.id).await {
                tokio::time::sleep(WORKER_EXIT_POLL).await;
            }
        })
        .await;

        if waited.is_err() {
            tracing::debug!(
                resource_id = %resource_id,
                grace_ms = grace.as_millis() as u64,
                "Worker still running after cancel grace period"
            );
        }

        Ok(task)
    }

    // File system probing happens before the registry lock is taken.
    async fn existing_artifacts(&self, resource_id: &str) -> Option<ExistingArtifacts> {
        let audio_path = self.paths.resolve_audio_file(resource_id, None).await?;
        let subtitle_path = self.paths.resolve_subtitle_file(resource_id, None).await;
        let metadata = self.catalog.stored_video_info(resource_id).await;

        Some(ExistingArtifacts {
            audio_path,
            subtitle_path,
            metadata,
        })
    }

    fn spawn_worker(&self, task: &Task, token: CancellationToken) {
        let ctx = WorkerContext {
            resource_id: task.resource_id.clone(),
            task_id: task.id,
            token,
            registry: self.registry.clone(),
            paths: self.paths.clone(),
            catalog: self.catalog.clone(),
            fetcher: self.fetcher.clone(),
            subtitle_langs: self.config.fetcher.subtitle_langs.clone(),
        };

        tokio::spawn(run_download_task(ctx));
    }
}
