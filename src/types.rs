//! Core types: tasks, their state machine, and the metadata documents served by the API

use crate::error::TaskError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;
use uuid::Uuid;

/// Unique identifier for a task
///
/// Used for correlation only. The registry is keyed by resource ID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Generate a fresh random TaskId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TaskId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Task status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Created, worker not yet running
    Pending,
    /// Worker is fetching the resource
    Downloading,
    /// Artifacts are on disk
    Completed,
    /// Fetch or resolution failed
    Failed,
    /// Cancelled by a caller
    Cancelled,
}

impl TaskStatus {
    /// Lowercase wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Downloading => "downloading",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// `Pending` or `Downloading`
    pub fn is_live(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Downloading)
    }

    /// `Completed`, `Failed` or `Cancelled`
    pub fn is_terminal(&self) -> bool {
        !self.is_live()
    }

    /// Transition table for the task state machine
    ///
    /// ```text
    /// Pending ──► Downloading ──► Completed
    ///    │             ├────────► Failed
    ///    └─────────────┴────────► Cancelled
    /// ```
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Downloading)
                | (TaskStatus::Pending, TaskStatus::Cancelled)
                | (TaskStatus::Downloading, TaskStatus::Completed)
                | (TaskStatus::Downloading, TaskStatus::Failed)
                | (TaskStatus::Downloading, TaskStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of artifact stored for a resource
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Audio track (`.mp3` once normalized)
    Audio,
    /// Subtitle track (`.vtt` once normalized)
    Subtitle,
    /// Video info document (`.json`)
    Metadata,
}

impl ArtifactKind {
    /// Canonical file extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Audio => "mp3",
            ArtifactKind::Subtitle => "vtt",
            ArtifactKind::Metadata => "json",
        }
    }
}

/// One retrieval of a resource, tracked by the registry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    /// Correlation ID
    pub id: TaskId,
    /// External resource identifier (registry key)
    pub resource_id: String,
    /// Current state
    pub status: TaskStatus,
    /// Progress in `[0.0, 1.0]`
    pub progress: f64,
    /// Human-readable status line
    pub message: String,
    /// Physical audio file backing the task, once known
    pub audio_path: Option<PathBuf>,
    /// Physical subtitle file backing the task, once known
    pub subtitle_path: Option<PathBuf>,
    /// Failure detail, only set when `Failed`
    pub error: Option<String>,
    /// When the task was created
    pub created_at: DateTime<Utc>,
    /// When the task reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,
    /// Descriptive metadata for the resource
    pub metadata: Option<VideoInfo>,
}

impl Task {
    /// Create a fresh `Pending` task
    pub fn pending(resource_id: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            resource_id: resource_id.into(),
            status: TaskStatus::Pending,
            progress: 0.0,
            message: "Task created".to_string(),
            audio_path: None,
            subtitle_path: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
            metadata: None,
        }
    }

    /// Synthesize a `Completed` task for artifacts that already exist on disk
    pub fn cached(resource_id: impl Into<String>, artifacts: ExistingArtifacts) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::new(),
            resource_id: resource_id.into(),
            status: TaskStatus::Completed,
            progress: 1.0,
            message: "Files already exist".to_string(),
            audio_path: Some(artifacts.audio_path),
            subtitle_path: artifacts.subtitle_path,
            error: None,
            created_at: now,
            completed_at: Some(now),
            metadata: artifacts.metadata,
        }
    }

    /// Apply a state machine transition
    ///
    /// Entering a terminal state stamps `completed_at`. Rejected transitions
    /// leave the task untouched.
    pub fn transition(
        &mut self,
        next: TaskStatus,
        message: impl Into<String>,
    ) -> std::result::Result<(), TaskError> {
        if !self.status.can_transition_to(next) {
            return Err(TaskError::InvalidTransition {
                resource_id: self.resource_id.clone(),
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        self.message = message.into();
        if next.is_terminal() && self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Raise progress while downloading; never lowers it
    pub fn advance_progress(&mut self, progress: f64) {
        if self.status == TaskStatus::Downloading {
            self.progress = self.progress.max(progress.clamp(0.0, 1.0));
        }
    }

    /// Whether the task is done and its files can be served
    pub fn files_ready(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

/// Artifacts found on disk before any worker ran
#[derive(Clone, Debug)]
pub struct ExistingArtifacts {
    /// Resolved audio file
    pub audio_path: PathBuf,
    /// Resolved subtitle file, if any
    pub subtitle_path: Option<PathBuf>,
    /// Info document read from the artifact directory, if present
    pub metadata: Option<VideoInfo>,
}

/// Task snapshot returned by `GET /status`
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskSnapshot {
    /// Correlation ID
    pub task_id: TaskId,
    /// Resource the task belongs to
    pub video_id: String,
    /// Current state
    pub status: TaskStatus,
    /// Progress in `[0.0, 1.0]`
    pub progress: f64,
    /// Human-readable status line
    pub message: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// True once the task is completed
    pub files_ready: bool,
    /// Completion time (completed tasks only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Whether an audio file is recorded (completed tasks only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_audio: Option<bool>,
    /// Whether a subtitle file is recorded (completed tasks only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_subtitle: Option<bool>,
    /// Video metadata (completed tasks only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_info: Option<VideoInfo>,
    /// Failure detail (failed tasks only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Task> for TaskSnapshot {
    fn from(task: &Task) -> Self {
        let completed = task.status == TaskStatus::Completed;
        Self {
            task_id: task.id,
            video_id: task.resource_id.clone(),
            status: task.status,
            progress: task.progress,
            message: task.message.clone(),
            created_at: task.created_at,
            files_ready: completed,
            completed_at: if completed { task.completed_at } else { None },
            has_audio: completed.then(|| task.audio_path.is_some()),
            has_subtitle: completed.then(|| task.subtitle_path.is_some()),
            video_info: if completed {
                task.metadata.clone()
            } else {
                None
            },
            error: if task.status == TaskStatus::Failed {
                task.error.clone()
            } else {
                None
            },
        }
    }
}

/// Detailed video information
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VideoInfo {
    /// Video ID
    pub id: String,
    /// Title
    pub title: String,
    /// Description, truncated to 500 characters
    pub description: String,
    /// Duration in seconds
    pub duration: f64,
    /// Uploader display name
    pub uploader: String,
    /// Owning channel ID
    pub channel_id: String,
    /// Owning channel name
    pub channel: String,
    /// View count
    pub view_count: u64,
    /// Like count
    pub like_count: u64,
    /// Upload date as `YYYYMMDD`
    pub upload_date: String,
    /// Canonical page URL
    pub webpage_url: String,
    /// Thumbnail URL
    pub thumbnail: String,
    /// When this document was produced
    pub updated_at: DateTime<Utc>,
}

/// Channel information
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChannelInfo {
    /// Channel ID (`UC...`)
    pub channel_id: String,
    /// Channel title
    pub title: String,
    /// Description, truncated to 500 characters
    pub description: String,
    /// Subscriber count, when the source reports it
    pub subscriber_count: Option<u64>,
    /// Number of entries seen while probing the channel
    pub video_count: u64,
    /// Thumbnail URL
    pub thumbnail: String,
    /// Uploader display name
    pub uploader: String,
    /// Canonical channel URL
    pub webpage_url: String,
    /// When this document was produced
    pub updated_at: DateTime<Utc>,
}

/// Entry in a channel's video listing
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VideoSummary {
    /// Video ID
    pub video_id: String,
    /// Title
    pub title: String,
    /// Description, truncated to 200 characters
    pub description: String,
    /// Duration in seconds
    pub duration: f64,
    /// Upload date as `YYYYMMDD`
    pub upload_date: String,
    /// View count
    pub view_count: u64,
    /// Thumbnail URL
    pub thumbnail: String,
    /// Canonical page URL
    pub webpage_url: String,
}

/// Channel returned by a search
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChannelSearchResult {
    /// Channel ID
    pub channel_id: String,
    /// Channel title
    pub title: String,
    /// Description, truncated to 200 characters
    pub description: String,
    /// Thumbnail URL
    pub thumbnail: String,
    /// Subscriber count (not reported by search)
    pub subscriber_count: Option<u64>,
    /// Video count (not reported by search)
    pub video_count: Option<u64>,
    /// Canonical channel URL
    pub webpage_url: String,
}

/// Task counts by state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TaskCounts {
    /// Pending or downloading
    pub active: usize,
    /// Completed
    pub completed: usize,
    /// Failed
    pub failed: usize,
    /// Cancelled
    pub cancelled: usize,
    /// All tasks in the registry
    pub total: usize,
}

/// Outcome of one janitor sweep
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CleanupReport {
    /// Artifact files deleted
    pub files_removed: usize,
    /// Metadata cache files deleted
    pub cache_files_removed: usize,
    /// Terminal task records evicted
    pub tasks_evicted: usize,
    /// Paths exempted because a task references them
    pub protected_paths: usize,
    /// Per-file failures that were skipped
    pub errors: usize,
}

/// Health report returned by `GET /health`
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthReport {
    /// Always "healthy" when the handler answers
    pub status: String,
    /// Crate version
    pub version: String,
    /// Name of the active media fetcher
    pub fetcher: String,
    /// Task counts
    pub tasks: TaskCounts,
    /// File counts per directory
    pub files: FileCounts,
    /// Absolute directory paths
    pub directories: Directories,
    /// Cache TTL in hours
    pub cache_expire_hours: f64,
}

/// File counts per storage directory
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct FileCounts {
    /// Files in the artifact directory
    pub download_files: usize,
    /// Files in the metadata cache directory
    pub cache_files: usize,
}

/// Storage directories
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Directories {
    /// Artifact directory
    #[schema(value_type = String)]
    pub download_dir: PathBuf,
    /// Metadata cache directory
    #[schema(value_type = String)]
    pub cache_dir: PathBuf,
}

/// A file belonging to a resource, as listed by `GET /debug/files`
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DebugFileEntry {
    /// File name
    pub name: String,
    /// Full path
    #[schema(value_type = String)]
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: Option<DateTime<Utc>>,
    /// Extension including the dot, empty when none
    pub extension: String,
    /// MIME type the audio route would use
    pub mime_type: String,
}

/// Task summary embedded in the debug listing
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DebugTaskSummary {
    /// Current state
    pub status: TaskStatus,
    /// Recorded audio file
    #[schema(value_type = Option<String>)]
    pub audio_file: Option<PathBuf>,
    /// Recorded subtitle file
    #[schema(value_type = Option<String>)]
    pub subtitle_file: Option<PathBuf>,
    /// Progress in `[0.0, 1.0]`
    pub progress: f64,
    /// Status line
    pub message: String,
}

/// Response of `GET /debug/files`
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DebugFilesReport {
    /// Resource ID
    pub video_id: String,
    /// Files sharing the resource's artifact prefix
    pub files: Vec<DebugFileEntry>,
    /// Registry entry for the resource, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<DebugTaskSummary>,
}

/// One step taken by `GET /fix/files`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FixAction {
    /// Extension-less file renamed to the canonical audio name
    Renamed {
        /// Old file name
        from: String,
        /// New file name
        to: String,
    },
    /// Task now records the renamed file
    UpdatedTask {
        /// New audio path
        #[schema(value_type = String)]
        audio_file: PathBuf,
    },
    /// Rename failed
    RenameFailed {
        /// Failure text
        error: String,
    },
    /// Canonical audio file already exists
    TargetExists {
        /// Explanation
        message: String,
    },
    /// No extension-less file to fix
    NotFound {
        /// Explanation
        message: String,
    },
}

/// Response of `GET /fix/files`
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct FixFilesReport {
    /// Resource ID
    pub video_id: String,
    /// Steps taken, in order
    pub actions: Vec<FixAction>,
}

/// Response of `GET /api/cookies/status`
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CookiesStatus {
    /// Whether the configured cookies file exists
    pub cookies_configured: bool,
    /// Configured cookies file path
    #[schema(value_type = Option<String>)]
    pub cookies_file: Option<PathBuf>,
    /// File size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Last modification time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

/// Response of `GET /api/cookies/diagnose`
///
/// Content fields are absent when the file is missing or unreadable.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CookiesDiagnosis {
    /// When the diagnosis ran
    pub timestamp: DateTime<Utc>,
    /// Whether the configured cookies file exists
    pub cookies_file_exists: bool,
    /// Configured cookies file path
    #[schema(value_type = Option<String>)]
    pub cookies_file: Option<PathBuf>,
    /// File size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Number of non-empty lines after trimming
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_count: Option<usize>,
    /// First line is a `#` header, as Netscape exports are
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_netscape_format: Option<bool>,
    /// Any line mentions youtube
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_youtube_cookies: Option<bool>,
    /// Cookie rows, i.e. lines that are neither blank nor comments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_cookie_count: Option<usize>,
    /// Human-readable verdict
    pub status: String,
}

/// One step of a connection test
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ConnectionCheck {
    /// Whether the step succeeded
    pub passed: bool,
    /// What the step found
    pub message: String,
    /// Title reported by the fetcher
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_title: Option<String>,
    /// Duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Formats offered for the video
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formats_available: Option<usize>,
    /// Audio-only formats offered for the video
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_formats_count: Option<usize>,
    /// Fetcher error text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Steps run by a connection test
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ConnectionChecks {
    /// Metadata extraction for the video
    pub basic_connection: ConnectionCheck,
    /// Audio format availability; skipped when extraction fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_formats: Option<ConnectionCheck>,
}

/// Response of `GET /api/test/youtube/{video_id}`
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ConnectionTest {
    /// When the test ran
    pub timestamp: DateTime<Utc>,
    /// Video the test extracted
    pub video_id: String,
    /// Whether every step passed
    pub ok: bool,
    /// Human-readable verdict
    pub overall_status: String,
    /// Per-step results
    pub tests: ConnectionChecks,
    /// Likely cause of a failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    /// Suggested remedies for a failure
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub solutions: Vec<String>,
}
