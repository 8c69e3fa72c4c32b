//! Configuration types for media-cache-broker

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Main configuration for [`MediaBroker`](crate::MediaBroker)
///
/// Every section has defaults, so an empty JSON object is a valid config.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Artifact and metadata cache storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Periodic cache sweep
    #[serde(default)]
    pub janitor: JanitorConfig,

    /// Task lifecycle tuning
    #[serde(default)]
    pub tasks: TaskConfig,

    /// Media fetcher (yt-dlp) discovery and options
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// API and external server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Load a configuration from a JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the broker misbehave
    pub fn validate(&self) -> Result<()> {
        if self.storage.cache_ttl.is_zero() {
            return Err(Error::Config {
                message: "cache_ttl must be greater than zero".to_string(),
                key: Some("storage.cache_ttl".to_string()),
            });
        }
        if self.janitor.enabled && self.janitor.interval.is_zero() {
            return Err(Error::Config {
                message: "janitor interval must be greater than zero".to_string(),
                key: Some("janitor.interval".to_string()),
            });
        }
        if self.storage.download_dir == self.storage.cache_dir {
            return Err(Error::Config {
                message: "download_dir and cache_dir must differ".to_string(),
                key: Some("storage.cache_dir".to_string()),
            });
        }
        Ok(())
    }
}

/// Storage locations and cache lifetime
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Artifact directory (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Metadata cache directory (default: "./cache")
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Age after which cached files and terminal tasks expire (default: 12 hours)
    #[serde(default = "default_cache_ttl", with = "duration_serde")]
    pub cache_ttl: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            cache_dir: default_cache_dir(),
            cache_ttl: default_cache_ttl(),
        }
    }
}

/// Cache janitor schedule
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JanitorConfig {
    /// Run the periodic sweep (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Time between sweeps (default: 1 hour)
    #[serde(default = "default_janitor_interval", with = "duration_serde")]
    pub interval: Duration,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: default_janitor_interval(),
        }
    }
}

/// Task lifecycle tuning
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskConfig {
    /// How long a cancel request waits for the worker to exit (default: 2 seconds)
    #[serde(default = "default_cancel_grace_period", with = "duration_serde")]
    pub cancel_grace_period: Duration,

    /// How long shutdown waits for workers (default: 30 seconds)
    #[serde(default = "default_shutdown_timeout", with = "duration_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            cancel_grace_period: default_cancel_grace_period(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Media fetcher configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Whether to search PATH for yt-dlp if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Netscape-format cookies file passed to the fetcher when it exists
    #[serde(default = "default_cookies_file")]
    pub cookies_file: Option<PathBuf>,

    /// Network socket timeout handed to the fetcher (default: 30 seconds)
    #[serde(default = "default_socket_timeout", with = "duration_serde")]
    pub socket_timeout: Duration,

    /// Fetcher retry count for requests and fragments (default: 15)
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Subtitle languages requested alongside the audio (default: ["en"])
    #[serde(default = "default_subtitle_langs")]
    pub subtitle_langs: Vec<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            search_path: true,
            cookies_file: default_cookies_file(),
            socket_timeout: default_socket_timeout(),
            retries: default_retries(),
            subtitle_langs: default_subtitle_langs(),
        }
    }
}

/// API and external server integration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:5000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: false)
    #[serde(default)]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: false,
        }
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(12 * 60 * 60)
}

fn default_janitor_interval() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_cancel_grace_period() -> Duration {
    Duration::from_secs(2)
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_cookies_file() -> Option<PathBuf> {
    Some(PathBuf::from("youtube_cookies.txt"))
}

fn default_socket_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_retries() -> u32 {
    15
}

fn default_subtitle_langs() -> Vec<String> {
    vec!["en".to_string()]
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();

        assert_eq!(config.storage.download_dir, PathBuf::from("downloads"));
        assert_eq!(config.storage.cache_dir, PathBuf::from("cache"));
        assert_eq!(config.storage.cache_ttl, Duration::from_secs(43_200));
        assert_eq!(config.janitor.interval, Duration::from_secs(3_600));
        assert_eq!(config.tasks.cancel_grace_period, Duration::from_secs(2));
        assert_eq!(config.fetcher.subtitle_langs, vec!["en".to_string()]);
        assert_eq!(
            config.server.api.bind_address,
            "127.0.0.1:5000".parse::<SocketAddr>().unwrap()
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn duration_serde_serializes_as_seconds() {
        let config = StorageConfig {
            cache_ttl: Duration::from_secs(90),
            ..Default::default()
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["cache_ttl"], 90);
    }

    #[test]
    fn duration_serde_deserializes_from_seconds() {
        let config: Config =
            serde_json::from_str(r#"{"storage":{"cache_ttl":60},"janitor":{"interval":5}}"#)
                .unwrap();
        assert_eq!(config.storage.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.janitor.interval, Duration::from_secs(5));
    }

    #[test]
    fn zero_ttl_is_rejected_with_key() {
        let mut config = Config::default();
        config.storage.cache_ttl = Duration::ZERO;

        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("storage.cache_ttl"))
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn zero_interval_only_rejected_when_janitor_enabled() {
        let mut config = Config::default();
        config.janitor.interval = Duration::ZERO;
        assert!(config.validate().is_err());

        config.janitor.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn shared_directories_are_rejected() {
        let mut config = Config::default();
        config.storage.cache_dir = config.storage.download_dir.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_file_reads_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broker.json");
        std::fs::write(&path, r#"{"server":{"api":{"bind_address":"0.0.0.0:8080"}}}"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.server.api.bind_address.port(), 8080);

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(Error::Config { .. })
        ));
    }
}
