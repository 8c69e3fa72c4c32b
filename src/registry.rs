//! In-memory task registry
//!
//! The registry is the single authority over task state. It is keyed by
//! resource ID, so at most one live task can exist per resource, and every
//! read and write goes through one async mutex. Clones share the same state.
//!
//! Worker-facing operations take the `(resource_id, task_id)` pair. A worker
//! whose task has been replaced (cancelled, evicted, re-requested) finds no
//! match and its writes are dropped.

use crate::error::TaskError;
use crate::types::{ExistingArtifacts, Task, TaskCounts, TaskId, TaskStatus, VideoInfo};
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Result of [`TaskRegistry::get_or_create`]
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    /// A live task already exists; nothing to spawn
    Existing(Task),
    /// Artifacts were already on disk; a completed task was recorded
    AlreadyCached(Task),
    /// A fresh pending task was inserted and needs a worker
    SpawnRequired {
        /// The new task
        task: Task,
        /// Token handed to the worker
        token: CancellationToken,
    },
}

impl CreateOutcome {
    /// Task carried by the outcome
    pub fn task(&self) -> &Task {
        match self {
            CreateOutcome::Existing(task) | CreateOutcome::AlreadyCached(task) => task,
            CreateOutcome::SpawnRequired { task, .. } => task,
        }
    }
}

struct TaskEntry {
    task: Task,
    // Some while a worker is attached
    token: Option<CancellationToken>,
}

#[derive(Default)]
struct RegistryState {
    tasks: HashMap<String, TaskEntry>,
}

/// Shared task registry
#[derive(Clone, Default)]
pub struct TaskRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

impl TaskRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the live task, record cached artifacts, or create a pending task
    ///
    /// `on_disk` must be resolved by the caller before this call; no file
    /// system work happens under the lock. A live task wins over artifacts on
    /// disk so a running worker is never orphaned.
    pub async fn get_or_create(
        &self,
        resource_id: &str,
        on_disk: Option<ExistingArtifacts>,
    ) -> CreateOutcome {
        let mut state = self.inner.lock().await;

        if let Some(entry) = state.tasks.get(resource_id) {
            if entry.task.status.is_live() {
                return CreateOutcome::Existing(entry.task.clone());
            }
        }

        if let Some(artifacts) = on_disk {
            let task = Task::cached(resource_id, artifacts);
            state.tasks.insert(
                resource_id.to_string(),
                TaskEntry {
                    task: task.clone(),
                    token: None,
                },
            );
            return CreateOutcome::AlreadyCached(task);
        }

        let task = Task::pending(resource_id);
        let token = CancellationToken::new();
        if let Some(previous) = state.tasks.insert(
            resource_id.to_string(),
            TaskEntry {
                task: task.clone(),
                token: Some(token.clone()),
            },
        ) {
            tracing::debug!(
                resource_id = %resource_id,
                previous_status = %previous.task.status,
                "Replaced terminal task"
            );
        }

        CreateOutcome::SpawnRequired { task, token }
    }

    /// Snapshot of the task for a resource
    pub async fn get(&self, resource_id: &str) -> Option<Task> {
        let state = self.inner.lock().await;
        state.tasks.get(resource_id).map(|e| e.task.clone())
    }

    /// Cancel the live task for a resource and fire its token
    pub async fn cancel(&self, resource_id: &str) -> Result<Task, TaskError> {
        let mut state = self.inner.lock().await;
        let entry = state
            .tasks
            .get_mut(resource_id)
            .ok_or_else(|| TaskError::NotFound {
                resource_id: resource_id.to_string(),
            })?;

        entry
            .task
            .transition(TaskStatus::Cancelled, "Task cancelled")?;
        if let Some(token) = &entry.token {
            token.cancel();
        }
        Ok(entry.task.clone())
    }

    /// Cancel every live task; returns how many were cancelled
    pub async fn cancel_all(&self) -> usize {
        let mut state = self.inner.lock().await;
        let mut cancelled = 0;
        for entry in state.tasks.values_mut() {
            if entry
                .task
                .transition(TaskStatus::Cancelled, "Task cancelled")
                .is_ok()
            {
                cancelled += 1;
            }
            if let Some(token) = &entry.token {
                token.cancel();
            }
        }
        cancelled
    }

    /// Remove terminal tasks that finished more than `ttl` ago
    ///
    /// Age is measured from `completed_at`, falling back to `created_at`.
    pub async fn evict_expired_tasks(&self, ttl: Duration) -> usize {
        let now = Utc::now();
        let mut state = self.inner.lock().await;
        let before = state.tasks.len();

        state.tasks.retain(|_, entry| {
            if entry.task.status.is_live() {
                return true;
            }
            let anchor = entry.task.completed_at.unwrap_or(entry.task.created_at);
            let expired = (now - anchor).to_std().is_ok_and(|age| age > ttl);
            !expired
        });

        before - state.tasks.len()
    }

    /// Apply a transition to the task owned by `task_id`
    pub async fn transition(
        &self,
        resource_id: &str,
        task_id: TaskId,
        next: TaskStatus,
        message: impl Into<String>,
    ) -> Result<Task, TaskError> {
        let message = message.into();
        self.with_owned(resource_id, task_id, |task| {
            task.transition(next, message)?;
            Ok(task.clone())
        })
        .await
    }

    /// Raise progress and optionally replace the status line
    ///
    /// Ignored unless the task is downloading. Returns whether the update applied.
    pub async fn update_progress(
        &self,
        resource_id: &str,
        task_id: TaskId,
        progress: f64,
        message: Option<String>,
    ) -> bool {
        self.with_owned(resource_id, task_id, |task| {
            if task.status != TaskStatus::Downloading {
                return Ok(false);
            }
            task.advance_progress(progress);
            if let Some(message) = message {
                task.message = message;
            }
            Ok(true)
        })
        .await
        .unwrap_or(false)
    }

    /// Mark the task completed with its resolved artifacts
    pub async fn complete(
        &self,
        resource_id: &str,
        task_id: TaskId,
        audio_path: PathBuf,
        subtitle_path: Option<PathBuf>,
    ) -> Result<Task, TaskError> {
        self.with_owned(resource_id, task_id, |task| {
            task.transition(TaskStatus::Completed, "Download completed")?;
            task.progress = 1.0;
            task.audio_path = Some(audio_path);
            task.subtitle_path = subtitle_path;
            Ok(task.clone())
        })
        .await
    }

    /// Mark the task failed; `error` is recorded verbatim
    pub async fn fail(
        &self,
        resource_id: &str,
        task_id: TaskId,
        error: impl Into<String>,
    ) -> Result<Task, TaskError> {
        let error = error.into();
        self.with_owned(resource_id, task_id, |task| {
            task.transition(TaskStatus::Failed, format!("Download failed: {error}"))?;
            task.error = Some(error);
            Ok(task.clone())
        })
        .await
    }

    /// Attach metadata to the task
    pub async fn set_metadata(&self, resource_id: &str, task_id: TaskId, info: VideoInfo) -> bool {
        self.with_owned(resource_id, task_id, |task| {
            task.metadata = Some(info);
            Ok(())
        })
        .await
        .is_ok()
    }

    /// Record a new audio path for whatever task the resource currently has
    pub async fn set_audio_path(&self, resource_id: &str, path: PathBuf) -> bool {
        let mut state = self.inner.lock().await;
        match state.tasks.get_mut(resource_id) {
            Some(entry) => {
                entry.task.audio_path = Some(path);
                true
            }
            None => false,
        }
    }

    /// Detach the worker from its task; called when the worker exits
    pub async fn deregister_worker(&self, resource_id: &str, task_id: TaskId) {
        let mut state = self.inner.lock().await;
        if let Some(entry) = state.tasks.get_mut(resource_id) {
            if entry.task.id == task_id {
                entry.token = None;
            }
        }
    }

    /// Whether the worker for `task_id` is still attached
    pub async fn has_worker(&self, resource_id: &str, task_id: TaskId) -> bool {
        let state = self.inner.lock().await;
        state
            .tasks
            .get(resource_id)
            .is_some_and(|e| e.task.id == task_id && e.token.is_some())
    }

    /// Number of attached workers
    pub async fn worker_count(&self) -> usize {
        let state = self.inner.lock().await;
        state.tasks.values().filter(|e| e.token.is_some()).count()
    }

    /// Every artifact path recorded on a task
    pub async fn protected_paths(&self) -> Vec<PathBuf> {
        let state = self.inner.lock().await;
        state
            .tasks
            .values()
            .flat_map(|e| [e.task.audio_path.clone(), e.task.subtitle_path.clone()])
            .flatten()
            .collect()
    }

    /// Task counts by state
    pub async fn counts(&self) -> TaskCounts {
        let state = self.inner.lock().await;
        let mut counts = TaskCounts {
            total: state.tasks.len(),
            ..Default::default()
        };
        for entry in state.tasks.values() {
            match entry.task.status {
                TaskStatus::Pending | TaskStatus::Downloading => counts.active += 1,
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Failed => counts.failed += 1,
                TaskStatus::Cancelled => counts.cancelled += 1,
            }
        }
        counts
    }

    async fn with_owned<R>(
        &self,
        resource_id: &str,
        task_id: TaskId,
        f: impl FnOnce(&mut Task) -> Result<R, TaskError>,
    ) -> Result<R, TaskError> {
        let mut state = self.inner.lock().await;
        match state.tasks.get_mut(resource_id) {
            Some(entry) if entry.task.id == task_id => f(&mut entry.task),
            _ => Err(TaskError::NotFound {
                resource_id: resource_id.to_string(),
            }),
        }
    }
}
