//! CLI-based fetcher using the external yt-dlp binary

use super::parser::{PROGRESS_TEMPLATE, parse_progress_line, summarize_stderr};
use super::traits::{ExtractOptions, FetchRequest, MediaFetcher, ProgressSender};
use crate::config::FetcherConfig;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

/// Fetcher that drives the external `yt-dlp` binary
///
/// # Examples
///
/// ```no_run
/// use media_cache_broker::fetcher::YtDlpFetcher;
/// use std::path::PathBuf;
///
/// // Explicit path
/// let fetcher = YtDlpFetcher::new(PathBuf::from("/usr/local/bin/yt-dlp"));
///
/// // Or auto-discover from PATH
/// let fetcher = YtDlpFetcher::from_path().expect("yt-dlp not found in PATH");
/// ```
pub struct YtDlpFetcher {
    binary_path: PathBuf,
    cookies_file: Option<PathBuf>,
    socket_timeout: Duration,
    retries: u32,
}

impl YtDlpFetcher {
    /// Create a fetcher with an explicit binary path and default options
    pub fn new(binary_path: PathBuf) -> Self {
        let defaults = FetcherConfig::default();
        Self {
            binary_path,
            cookies_file: None,
            socket_timeout: defaults.socket_timeout,
            retries: defaults.retries,
        }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Build a fetcher from configuration
    ///
    /// Uses `ytdlp_path` when set, otherwise searches PATH if `search_path`
    /// allows it. Returns `None` when no binary is available.
    pub fn from_config(config: &FetcherConfig) -> Option<Self> {
        let binary_path = match &config.ytdlp_path {
            Some(path) => path.clone(),
            None if config.search_path => which::which("yt-dlp").ok()?,
            None => return None,
        };

        Some(Self {
            binary_path,
            cookies_file: config.cookies_file.clone(),
            socket_timeout: config.socket_timeout,
            retries: config.retries,
        })
    }

    /// Path of the binary this fetcher runs
    pub fn binary_path(&self) -> &std::path::Path {
        &self.binary_path
    }

    fn base_command(&self) -> Command {
        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("--no-warnings")
            .arg("--socket-timeout")
            .arg(self.socket_timeout.as_secs().to_string())
            .arg("--retries")
            .arg(self.retries.to_string())
            .arg("--fragment-retries")
            .arg(self.retries.to_string());

        if let Some(cookies) = &self.cookies_file
            && cookies.is_file()
        {
            cmd.arg("--cookies").arg(cookies);
        }

        cmd.kill_on_drop(true);
        cmd
    }

    fn download_args(&self, request: &FetchRequest) -> Vec<String> {
        let langs = if request.subtitle_langs.is_empty() {
            "en".to_string()
        } else {
            request.subtitle_langs.join(",")
        };

        vec![
            "-f".into(),
            "bestaudio/best".into(),
            "-o".into(),
            format!("{}.%(ext)s", request.output_base.display()),
            "--extract-audio".into(),
            "--audio-format".into(),
            "mp3".into(),
            "--audio-quality".into(),
            "128K".into(),
            "--write-subs".into(),
            "--write-auto-subs".into(),
            "--sub-langs".into(),
            langs,
            "--sub-format".into(),
            "vtt".into(),
            "--no-playlist".into(),
            "--newline".into(),
            "--progress-template".into(),
            PROGRESS_TEMPLATE.into(),
            request.url.clone(),
        ]
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(&self, request: &FetchRequest, progress: ProgressSender) -> crate::Result<()> {
        let mut child = self
            .base_command()
            .args(self.download_args(request))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| crate::Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e)))?;

        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf).await;
                buf
            })
        });

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                if let Some(event) = parse_progress_line(&line) {
                    // receiver gone means the worker stopped listening; keep draining
                    let _ = progress.send(event);
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| crate::Error::ExternalTool(format!("Failed to wait for yt-dlp: {}", e)))?;

        let stderr = match stderr_task {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };

        if status.success() {
            Ok(())
        } else {
            let summary = summarize_stderr(&stderr);
            Err(crate::Error::Fetch(if summary.is_empty() {
                format!("yt-dlp exited with {}", status)
            } else {
                summary
            }))
        }
    }

    async fn extract_info(
        &self,
        url: &str,
        options: &ExtractOptions,
    ) -> crate::Result<serde_json::Value> {
        let mut cmd = self.base_command();
        cmd.arg("--dump-single-json").arg("--skip-download");
        if options.flat {
            cmd.arg("--flat-playlist");
        } else {
            cmd.arg("--no-playlist");
        }
        if let Some(items) = &options.playlist_items {
            cmd.arg("--playlist-items").arg(items);
        }
        cmd.arg(url);

        let output = cmd
            .output()
            .await
            .map_err(|e| crate::Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let summary = summarize_stderr(&stderr);
            return Err(crate::Error::Fetch(if summary.is_empty() {
                format!("yt-dlp exited with {}", output.status)
            } else {
                summary
            }));
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}
