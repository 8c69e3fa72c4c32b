//! Background janitor, health reporting and diagnostics.

use crate::error::Result;
use crate::fetcher::{ExtractOptions, watch_url};
use crate::janitor::Janitor;
use crate::paths::validate_resource_id;
use crate::types::{
    CleanupReport, ConnectionCheck, ConnectionChecks, ConnectionTest, CookiesDiagnosis,
    CookiesStatus, Directories, FileCounts, HealthReport, VideoInfo,
};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use super::MediaBroker;

impl MediaBroker {
    /// Video info for a resource, from its artifact info file or the catalog
    pub async fn info(&self, resource_id: &str) -> Result<VideoInfo> {
        validate_resource_id(resource_id)?;
        self.catalog.task_video_info(resource_id).await
    }

    /// Start the periodic cache janitor
    ///
    /// Returns an already-finished handle when the janitor is disabled. The
    /// loop stops when [`shutdown`](Self::shutdown) runs.
    pub fn start_janitor(&self) -> tokio::task::JoinHandle<()> {
        if !self.config.janitor.enabled {
            tracing::info!("Cache janitor disabled, skipping");
            return tokio::spawn(async {});
        }

        let janitor = self.janitor();
        let interval = self.config.janitor.interval;
        let shutdown = self.shutdown_token.child_token();

        let handle = tokio::spawn(janitor.run(interval, shutdown));
        tracing::info!("Cache janitor background task started");
        handle
    }

    /// Run one janitor sweep now
    pub async fn cleanup_now(&self) -> CleanupReport {
        tracing::info!("Manual cleanup triggered");
        self.janitor().run_once().await
    }

    /// Service health and storage summary
    pub async fn health(&self) -> HealthReport {
        let storage = &self.config.storage;

        HealthReport {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            fetcher: self.fetcher.name().to_string(),
            tasks: self.registry.counts().await,
            files: FileCounts {
                download_files: count_files(&storage.download_dir).await,
                cache_files: count_files(&storage.cache_dir).await,
            },
            directories: Directories {
                download_dir: absolute(&storage.download_dir).await,
                cache_dir: absolute(&storage.cache_dir).await,
            },
            cache_expire_hours: storage.cache_ttl.as_secs_f64() / 3600.0,
        }
    }

    /// Whether the configured cookies file is present
    pub async fn cookies_status(&self) -> CookiesStatus {
        let cookies_file = self.config.fetcher.cookies_file.clone();
        let metadata = match &cookies_file {
            Some(path) => tokio::fs::metadata(path).await.ok().filter(|m| m.is_file()),
            None => None,
        };

        CookiesStatus {
            cookies_configured: metadata.is_some(),
            file_size: metadata.as_ref().map(|m| m.len()),
            last_modified: metadata
                .as_ref()
                .and_then(|m| m.modified().ok())
                .map(DateTime::<Utc>::from),
            cookies_file,
        }
    }

    /// Inspect the cookies file contents
    pub async fn cookies_diagnosis(&self) -> CookiesDiagnosis {
        let cookies_file = self.config.fetcher.cookies_file.clone();
        let mut diagnosis = CookiesDiagnosis {
            timestamp: Utc::now(),
            cookies_file_exists: false,
            cookies_file: cookies_file.clone(),
            file_size: None,
            line_count: None,
            is_netscape_format: None,
            has_youtube_cookies: None,
            valid_cookie_count: None,
            status: "Cookies file not found".to_string(),
        };

        let Some(path) = cookies_file else {
            return diagnosis;
        };
        if !tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
            return diagnosis;
        }
        diagnosis.cookies_file_exists = true;

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let stats = inspect_cookies(&content);
                diagnosis.file_size = Some(content.len() as u64);
                diagnosis.line_count = Some(stats.line_count);
                diagnosis.is_netscape_format = Some(stats.netscape_header);
                diagnosis.has_youtube_cookies = Some(stats.mentions_youtube);
                diagnosis.valid_cookie_count = Some(stats.cookie_rows);
                diagnosis.status = if stats.cookie_rows > 0 {
                    "Cookies file looks valid".to_string()
                } else {
                    "Cookies file is empty or malformed".to_string()
                };
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read cookies file");
                diagnosis.status = format!("Cannot read cookies file: {e}");
            }
        }
        diagnosis
    }

    /// Extract one video's info and report whether the fetcher can reach it
    ///
    /// Fetch failures are part of the report, never an `Err`.
    pub async fn test_connection(&self, video_id: &str) -> Result<ConnectionTest> {
        validate_resource_id(video_id)?;

        let options = ExtractOptions {
            flat: true,
            playlist_items: None,
        };
        let extracted = self.fetcher.extract_info(&watch_url(video_id), &options).await;

        let report = match extracted {
            Ok(info) => {
                let formats = info["formats"].as_array().map(Vec::as_slice).unwrap_or_default();
                let audio_only = formats.iter().filter(|f| f["vcodec"] == "none").count();

                ConnectionTest {
                    timestamp: Utc::now(),
                    video_id: video_id.to_string(),
                    ok: true,
                    overall_status: "Connection OK".to_string(),
                    tests: ConnectionChecks {
                        basic_connection: ConnectionCheck {
                            passed: true,
                            message: "Video info retrieved".to_string(),
                            video_title: info["title"].as_str().map(str::to_string),
                            duration: info["duration"].as_f64(),
                            formats_available: Some(formats.len()),
                            ..Default::default()
                        },
                        audio_formats: Some(ConnectionCheck {
                            passed: true,
                            message: "Audio formats available".to_string(),
                            audio_formats_count: Some(audio_only),
                            ..Default::default()
                        }),
                    },
                    diagnosis: None,
                    solutions: Vec::new(),
                }
            }
            Err(e) => {
                let error = e.to_string();
                tracing::warn!(video_id = %video_id, error = %error, "Connection test failed");
                let (diagnosis, solutions) = diagnose_fetch_error(&error);

                ConnectionTest {
                    timestamp: Utc::now(),
                    video_id: video_id.to_string(),
                    ok: false,
                    overall_status: "Connection failed".to_string(),
                    tests: ConnectionChecks {
                        basic_connection: ConnectionCheck {
                            passed: false,
                            message: "Could not retrieve video info".to_string(),
                            error: Some(error),
                            ..Default::default()
                        },
                        audio_formats: None,
                    },
                    diagnosis: Some(diagnosis),
                    solutions,
                }
            }
        };
        Ok(report)
    }

    fn janitor(&self) -> Janitor {
        Janitor::new(
            self.registry.clone(),
            self.config.storage.download_dir.clone(),
            self.config.storage.cache_dir.clone(),
            self.config.storage.cache_ttl,
        )
    }
}

async fn count_files(dir: &Path) -> usize {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return 0;
    };
    let mut count = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_type().await.is_ok_and(|t| t.is_file()) {
            count += 1;
        }
    }
    count
}

async fn absolute(path: &Path) -> PathBuf {
    tokio::fs::canonicalize(path)
        .await
        .unwrap_or_else(|_| path.to_path_buf())
}

#[derive(Debug, PartialEq)]
pub(crate) struct CookieFileStats {
    pub(crate) line_count: usize,
    pub(crate) netscape_header: bool,
    pub(crate) mentions_youtube: bool,
    pub(crate) cookie_rows: usize,
}

/// Summarize a cookies.txt export
///
/// `#HttpOnly_` prefixed rows are cookies, not comments.
pub(crate) fn inspect_cookies(content: &str) -> CookieFileStats {
    let lines: Vec<&str> = content.trim().lines().collect();
    let is_cookie_row = |line: &str| {
        !line.trim().is_empty() && (!line.starts_with('#') || line.starts_with("#HttpOnly_"))
    };

    CookieFileStats {
        line_count: lines.len(),
        netscape_header: lines.first().is_some_and(|l| l.starts_with('#')),
        mentions_youtube: lines.iter().any(|l| l.to_lowercase().contains("youtube")),
        cookie_rows: lines.iter().filter(|line| is_cookie_row(line)).count(),
    }
}

/// Likely cause and remedies for a failed extraction
pub(crate) fn diagnose_fetch_error(error: &str) -> (String, Vec<String>) {
    let lower = error.to_lowercase();
    let (diagnosis, solutions): (String, &[&str]) = if error.contains("403") {
        (
            "HTTP 403: the site refused access".to_string(),
            &[
                "Check whether the cookies have expired: GET /api/cookies/diagnose",
                "Export fresh cookies from a new signed-in session",
                "The IP may be rate limited; retry in an hour or two",
                "Try a VPN or proxy",
            ],
        )
    } else if lower.contains("bot") || lower.contains("sign in") {
        (
            "Bot verification required".to_string(),
            &[
                "Export valid cookies for the site",
                "Check the configured cookies file path",
                "Restart the service after replacing the cookies",
            ],
        )
    } else {
        (
            format!("Unexpected error: {error}"),
            &[
                "Check network connectivity",
                "Make sure yt-dlp is up to date",
                "Inspect the service log for the full error",
            ],
        )
    };
    (diagnosis, solutions.iter().map(|s| s.to_string()).collect())
}
