//! Download worker
//!
//! One worker runs per spawned task. It drives the task from `Pending` to a
//! terminal state and never returns an error: failures are recorded on the
//! task. Cancellation is cooperative and observed at two checkpoints, before
//! the fetch starts and after it returns. The fetch itself is not preempted.

use crate::catalog::Catalog;
use crate::error::TaskError;
use crate::fetcher::{FetchProgress, FetchRequest, MediaFetcher, watch_url};
use crate::paths::PathResolver;
use crate::registry::TaskRegistry;
use crate::types::{TaskId, TaskStatus};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Progress after metadata is loaded and before bytes arrive
pub const PROGRESS_RESOLVED: f64 = 0.1;
/// Progress once the fetcher reports the transfer finished
pub const PROGRESS_FETCHED: f64 = 0.9;
const PROGRESS_UNKNOWN_STEP: f64 = 0.01;

/// Everything a worker needs, handed over at spawn time
pub struct WorkerContext {
    /// Resource being downloaded
    pub resource_id: String,
    /// Task the worker owns
    pub task_id: TaskId,
    /// Fired when the task is cancelled or the broker shuts down
    pub token: CancellationToken,
    /// Shared registry
    pub registry: TaskRegistry,
    /// Artifact path resolution
    pub paths: PathResolver,
    /// Metadata lookups
    pub catalog: Catalog,
    /// Media fetcher
    pub fetcher: Arc<dyn MediaFetcher>,
    /// Subtitle languages to request
    pub subtitle_langs: Vec<String>,
}

/// Drive one task to a terminal state, then detach from the registry
pub async fn run_download_task(ctx: WorkerContext) {
    tracing::info!(
        resource_id = %ctx.resource_id,
        task_id = %ctx.task_id,
        fetcher = ctx.fetcher.name(),
        "Download worker started"
    );

    drive(&ctx).await;

    ctx.registry
        .deregister_worker(&ctx.resource_id, ctx.task_id)
        .await;
    tracing::debug!(resource_id = %ctx.resource_id, "Download worker exited");
}

async fn drive(ctx: &WorkerContext) {
    let id = ctx.resource_id.as_str();

    if let Err(e) = ctx
        .registry
        .transition(id, ctx.task_id, TaskStatus::Downloading, "Preparing download")
        .await
    {
        tracing::info!(resource_id = %id, reason = %e, "Task no longer pending, worker exiting");
        return;
    }

    match ctx.catalog.task_video_info(id).await {
        Ok(info) => {
            ctx.registry.set_metadata(id, ctx.task_id, info).await;
        }
        Err(e) => {
            record_failure(ctx, e.to_string()).await;
            return;
        }
    }

    ctx.registry
        .update_progress(
            id,
            ctx.task_id,
            PROGRESS_RESOLVED,
            Some("Resolving download".to_string()),
        )
        .await;

    if ctx.token.is_cancelled() {
        tracing::info!(resource_id = %id, "Task cancelled before fetch");
        return;
    }

    let request = FetchRequest {
        url: watch_url(id),
        output_base: ctx.paths.base_path(id),
        subtitle_langs: ctx.subtitle_langs.clone(),
    };

    // The sender is moved into the fetch so the drain loop ends with it.
    let (tx, mut rx) = mpsc::unbounded_channel();
    let fetch = ctx.fetcher.fetch(&request, tx);
    let drain = async {
        let mut progress = PROGRESS_RESOLVED;
        while let Some(event) = rx.recv().await {
            let (next, message) = map_progress(progress, event);
            progress = progress.max(next);
            ctx.registry
                .update_progress(id, ctx.task_id, progress, Some(message))
                .await;
        }
    };
    let (result, ()) = tokio::join!(fetch, drain);

    if ctx.token.is_cancelled() {
        tracing::info!(resource_id = %id, "Task cancelled during fetch, discarding result");
        return;
    }

    if let Err(e) = result {
        record_failure(ctx, e.to_string()).await;
        return;
    }

    let Some(found) = ctx.paths.resolve_audio_file(id, None).await else {
        let missing = TaskError::ArtifactMissing {
            resource_id: id.to_string(),
        };
        record_failure(ctx, missing.to_string()).await;
        return;
    };
    let audio_path = ctx.paths.normalize_audio_extension(id, &found).await;

    let subtitle_path = match ctx.paths.resolve_subtitle_file(id, None).await {
        Some(found) => Some(ctx.paths.normalize_subtitle_extension(id, &found).await),
        None => {
            tracing::info!(resource_id = %id, "No subtitle file produced");
            None
        }
    };

    match ctx
        .registry
        .complete(id, ctx.task_id, audio_path.clone(), subtitle_path)
        .await
    {
        Ok(_) => tracing::info!(
            resource_id = %id,
            audio = %audio_path.display(),
            "Download completed"
        ),
        Err(e) => tracing::info!(resource_id = %id, reason = %e, "Completion not recorded"),
    }
}

async fn record_failure(ctx: &WorkerContext, error: String) {
    tracing::warn!(resource_id = %ctx.resource_id, error = %error, "Download failed");
    if let Err(e) = ctx
        .registry
        .fail(&ctx.resource_id, ctx.task_id, error)
        .await
    {
        tracing::debug!(resource_id = %ctx.resource_id, reason = %e, "Failure not recorded");
    }
}

/// Map a fetcher event onto task progress and a status line
///
/// Known totals map linearly onto `[0.1, 0.9]`. Unknown totals creep forward
/// by 0.01 up to 0.9.
pub fn map_progress(current: f64, event: FetchProgress) -> (f64, String) {
    match event {
        FetchProgress::Downloading {
            downloaded_bytes,
            total_bytes: Some(total),
        } if total > 0 => {
            let fraction = (downloaded_bytes as f64 / total as f64).clamp(0.0, 1.0);
            let progress = (PROGRESS_RESOLVED + 0.8 * fraction).clamp(PROGRESS_RESOLVED, PROGRESS_FETCHED);
            (progress, format!("Downloading... {:.1}%", fraction * 100.0))
        }
        FetchProgress::Downloading { .. } => (
            (current + PROGRESS_UNKNOWN_STEP).min(PROGRESS_FETCHED),
            "Downloading...".to_string(),
        ),
        FetchProgress::Finished => (
            PROGRESS_FETCHED,
            "Download finished, processing".to_string(),
        ),
    }
}
