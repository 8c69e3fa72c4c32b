//! Deterministic artifact paths and on-disk resolution
//!
//! Every resource maps to `{hash12}_{resource_id}` inside the artifact
//! directory, where `hash12` is the first 12 hex digits of the MD5 of the
//! resource ID. The fetcher chooses its own container, so the audio file may
//! land under any of several extensions; resolution walks a fixed, ordered
//! candidate table and normalization renames the winner to the canonical name.

use crate::error::{Error, Result};
use crate::types::ArtifactKind;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Extensions probed, in order, after the canonical `.mp3` misses.
///
/// The empty entry is the bare base path: the fetcher sometimes writes the
/// stream without any extension.
pub const AUDIO_FALLBACK_EXTENSIONS: [&str; 6] = ["", ".m4a", ".mp4", ".aac", ".webm", ".mp3"];

/// Subtitle suffixes probed, in order. The first entry is canonical.
pub const SUBTITLE_CANDIDATES: [&str; 4] = [".vtt", ".en.vtt", ".srt", ".en.srt"];

const MAX_RESOURCE_ID_LEN: usize = 128;

/// First 12 hex digits of the MD5 digest of `id`
pub fn hash_prefix(id: &str) -> String {
    let digest = format!("{:x}", md5::compute(id.as_bytes()));
    digest[..12].to_string()
}

/// Reject resource IDs that could escape the artifact directory
///
/// Accepted IDs are 1 to 128 characters of `[A-Za-z0-9_-]`.
pub fn validate_resource_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::Validation("missing id parameter".to_string()));
    }
    if id.len() > MAX_RESOURCE_ID_LEN {
        return Err(Error::Validation(format!(
            "id must be at most {MAX_RESOURCE_ID_LEN} characters"
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::Validation(format!(
            "id contains invalid characters: {id}"
        )));
    }
    Ok(())
}

/// MIME type used when serving an audio artifact
pub fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("mp3") => "audio/mpeg",
        Some("aac") => "audio/aac",
        Some("webm") => "audio/webm",
        Some("ogg") => "audio/ogg",
        Some("wav") => "audio/wav",
        Some("flac") => "audio/flac",
        // bare fetcher output is an mp4 container in practice
        _ => "audio/mp4",
    }
}

/// Maps resource IDs to artifact paths under one directory
#[derive(Clone, Debug)]
pub struct PathResolver {
    download_dir: PathBuf,
}

impl PathResolver {
    /// Create a resolver rooted at `download_dir`
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
        }
    }

    /// Artifact directory
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// `{hash12}_{resource_id}`, shared by every artifact of the resource
    pub fn file_stem(&self, resource_id: &str) -> String {
        format!("{}_{}", hash_prefix(resource_id), resource_id)
    }

    /// Extension-less path handed to the fetcher as its output base
    pub fn base_path(&self, resource_id: &str) -> PathBuf {
        self.download_dir.join(self.file_stem(resource_id))
    }

    /// Canonical path for an artifact kind
    pub fn canonical_path(&self, resource_id: &str, kind: ArtifactKind) -> PathBuf {
        with_suffix(
            &self.base_path(resource_id),
            &format!(".{}", kind.extension()),
        )
    }

    /// Find the audio file backing a resource
    ///
    /// Order: the path recorded on the task, the canonical `.mp3`, then
    /// [`AUDIO_FALLBACK_EXTENSIONS`] against the base path. Only non-empty
    /// regular files count.
    pub async fn resolve_audio_file(
        &self,
        resource_id: &str,
        recorded: Option<&Path>,
    ) -> Option<PathBuf> {
        if let Some(path) = recorded {
            if is_non_empty_file(path).await {
                return Some(path.to_path_buf());
            }
        }

        let canonical = self.canonical_path(resource_id, ArtifactKind::Audio);
        if is_non_empty_file(&canonical).await {
            return Some(canonical);
        }

        let base = self.base_path(resource_id);
        for ext in AUDIO_FALLBACK_EXTENSIONS {
            let candidate = with_suffix(&base, ext);
            if is_non_empty_file(&candidate).await {
                return Some(candidate);
            }
        }

        None
    }

    /// Rename a resolved audio file to the canonical `.mp3` name
    ///
    /// Returns the path that now holds the audio. A failed rename is logged
    /// and the original path is returned unchanged.
    pub async fn normalize_audio_extension(&self, resource_id: &str, found: &Path) -> PathBuf {
        let canonical = self.canonical_path(resource_id, ArtifactKind::Audio);
        normalize_to(resource_id, found, canonical).await
    }

    /// Find the subtitle file for a resource, if any
    ///
    /// Order: the path recorded on the task, then [`SUBTITLE_CANDIDATES`].
    pub async fn resolve_subtitle_file(
        &self,
        resource_id: &str,
        recorded: Option<&Path>,
    ) -> Option<PathBuf> {
        if let Some(path) = recorded {
            if is_non_empty_file(path).await {
                return Some(path.to_path_buf());
            }
        }

        let base = self.base_path(resource_id);
        for suffix in SUBTITLE_CANDIDATES {
            let candidate = with_suffix(&base, suffix);
            if is_non_empty_file(&candidate).await {
                return Some(candidate);
            }
        }

        None
    }

    /// Rename a resolved subtitle file to the canonical `.vtt` name
    pub async fn normalize_subtitle_extension(&self, resource_id: &str, found: &Path) -> PathBuf {
        let canonical = self.canonical_path(resource_id, ArtifactKind::Subtitle);
        normalize_to(resource_id, found, canonical).await
    }

    /// Every file in the artifact directory whose name starts with the resource's stem
    pub async fn list_resource_files(&self, resource_id: &str) -> Result<Vec<PathBuf>> {
        let stem = self.file_stem(resource_id);
        let mut files = Vec::new();

        let mut entries = match tokio::fs::read_dir(&self.download_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let matches = name.to_str().is_some_and(|n| n.starts_with(&stem));
            if matches && entry.file_type().await.is_ok_and(|t| t.is_file()) {
                files.push(entry.path());
            }
        }

        files.sort();
        Ok(files)
    }
}

/// Rename `from` to `to`, mapping failures to [`Error::Storage`]
pub async fn rename_artifact(from: &Path, to: &Path) -> Result<()> {
    tokio::fs::rename(from, to)
        .await
        .map_err(|e| Error::Storage {
            path: from.to_path_buf(),
            reason: format!("rename to {} failed: {}", to.display(), e),
        })
}

async fn normalize_to(resource_id: &str, found: &Path, canonical: PathBuf) -> PathBuf {
    if found == canonical {
        return canonical;
    }

    match rename_artifact(found, &canonical).await {
        Ok(()) => {
            tracing::info!(
                resource_id = %resource_id,
                from = %found.display(),
                to = %canonical.display(),
                "Normalized artifact name"
            );
            canonical
        }
        Err(e) => {
            tracing::warn!(
                resource_id = %resource_id,
                error = %e,
                "Keeping unnormalized artifact name"
            );
            found.to_path_buf()
        }
    }
}

async fn is_non_empty_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

// Resource IDs may contain characters `Path::with_extension` would treat as
// an extension boundary, so suffixes are appended to the raw OS string.
fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut raw: OsString = base.as_os_str().to_owned();
    raw.push(suffix);
    PathBuf::from(raw)
}
