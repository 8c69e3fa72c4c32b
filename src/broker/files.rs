//! Artifact lookup and file repair.

use crate::error::{Error, Result};
use crate::paths::{mime_for, rename_artifact, validate_resource_id};
use crate::types::{
    ArtifactKind, DebugFileEntry, DebugFilesReport, DebugTaskSummary, FixAction, FixFilesReport,
};
use chrono::{DateTime, Utc};
use std::path::PathBuf;

use super::MediaBroker;

impl MediaBroker {
    /// Audio file to serve for a resource
    ///
    /// Tries the path recorded on the task, then the canonical and fallback
    /// names on disk.
    pub async fn audio_file(&self, resource_id: &str) -> Result<PathBuf> {
        validate_resource_id(resource_id)?;
        let recorded = self
            .registry
            .get(resource_id)
            .await
            .and_then(|t| t.audio_path);

        self.paths
            .resolve_audio_file(resource_id, recorded.as_deref())
            .await
            .ok_or_else(|| Error::NotFound(format!("audio file for {resource_id}")))
    }

    /// Subtitle file to serve for a resource
    pub async fn subtitle_file(&self, resource_id: &str) -> Result<PathBuf> {
        validate_resource_id(resource_id)?;
        let recorded = self
            .registry
            .get(resource_id)
            .await
            .and_then(|t| t.subtitle_path);

        self.paths
            .resolve_subtitle_file(resource_id, recorded.as_deref())
            .await
            .ok_or_else(|| Error::NotFound(format!("subtitle file for {resource_id}")))
    }

    /// List every file sharing the resource's artifact prefix, plus its task
    pub async fn debug_files(&self, resource_id: &str) -> Result<DebugFilesReport> {
        validate_resource_id(resource_id)?;

        let mut files = Vec::new();
        for path in self.paths.list_resource_files(resource_id).await? {
            let metadata = match tokio::fs::metadata(&path).await {
                Ok(m) => m,
                // removed between listing and stat
                Err(_) => continue,
            };
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let extension = path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();

            files.push(DebugFileEntry {
                name,
                mime_type: mime_for(&path).to_string(),
                size: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
                extension,
                path,
            });
        }

        let task = self
            .registry
            .get(resource_id)
            .await
            .map(|t| DebugTaskSummary {
                status: t.status,
                audio_file: t.audio_path,
                subtitle_file: t.subtitle_path,
                progress: t.progress,
                message: t.message,
            });

        Ok(DebugFilesReport {
            video_id: resource_id.to_string(),
            files,
            task,
        })
    }

    /// Rename an extension-less audio file to the canonical `.mp3` name
    ///
    /// Never overwrites an existing canonical file. When the rename succeeds
    /// and the resource has a task, the task's audio path is updated.
    pub async fn fix_files(&self, resource_id: &str) -> Result<FixFilesReport> {
        validate_resource_id(resource_id)?;

        let base = self.paths.base_path(resource_id);
        let target = self.paths.canonical_path(resource_id, ArtifactKind::Audio);
        let file_name = |p: &PathBuf| {
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        };

        let mut actions = Vec::new();
        let base_is_file = tokio::fs::metadata(&base)
            .await
            .is_ok_and(|m| m.is_file());

        if !base_is_file {
            actions.push(FixAction::NotFound {
                message: format!("No file found: {}", file_name(&base)),
            });
        } else if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            actions.push(FixAction::TargetExists {
                message: format!("{} already exists", file_name(&target)),
            });
        } else {
            match rename_artifact(&base, &target).await {
                Ok(()) => {
                    tracing::info!(resource_id = %resource_id, "Renamed extension-less audio file");
                    actions.push(FixAction::Renamed {
                        from: file_name(&base),
                        to: file_name(&target),
                    });
                    if self
                        .registry
                        .set_audio_path(resource_id, target.clone())
                        .await
                    {
                        actions.push(FixAction::UpdatedTask { audio_file: target });
                    }
                }
                Err(e) => {
                    tracing::warn!(resource_id = %resource_id, error = %e, "Audio file rename failed");
                    actions.push(FixAction::RenameFailed {
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(FixFilesReport {
            video_id: resource_id.to_string(),
            actions,
        })
    }
}
