//! Broker facade split into focused submodules.
//!
//! The `MediaBroker` struct and its methods are organized by domain:
//! - [`control`] - Download requests, status and cancellation
//! - [`files`] - Artifact lookup and file repair
//! - [`services`] - Janitor, health and diagnostics
//! - [`lifecycle`] - Startup and shutdown coordination

mod control;
mod files;
mod lifecycle;
mod services;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use control::{DownloadOutcome, DownloadTicket};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::{MediaFetcher, NoOpFetcher, YtDlpFetcher};
use crate::metadata_cache::MetadataCache;
use crate::paths::PathResolver;
use crate::registry::TaskRegistry;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio_util::sync::CancellationToken;

/// Main broker instance (cloneable - all fields are shared)
#[derive(Clone)]
pub struct MediaBroker {
    /// Configuration
    pub(crate) config: Arc<Config>,
    /// Authoritative task state
    pub(crate) registry: TaskRegistry,
    /// Artifact path resolution
    pub(crate) paths: PathResolver,
    /// Cached metadata lookups
    pub(crate) catalog: Catalog,
    /// Media fetcher (trait object for pluggable implementations)
    pub(crate) fetcher: Arc<dyn MediaFetcher>,
    /// Cleared during shutdown; new downloads are refused afterwards
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Fired during shutdown to stop the janitor
    pub(crate) shutdown_token: CancellationToken,
}

impl MediaBroker {
    /// Create a broker, selecting the fetcher from configuration
    ///
    /// Uses the configured yt-dlp path, else searches PATH when allowed, else
    /// falls back to [`NoOpFetcher`] so the service still starts and serves
    /// cached artifacts.
    pub async fn new(config: Config) -> Result<Self> {
        let fetcher: Arc<dyn MediaFetcher> = match YtDlpFetcher::from_config(&config.fetcher) {
            Some(fetcher) => Arc::new(fetcher),
            None => {
                tracing::warn!("yt-dlp not found, downloads and metadata lookups are disabled");
                Arc::new(NoOpFetcher)
            }
        };

        Self::with_fetcher(config, fetcher).await
    }

    /// Create a broker around an explicit fetcher
    pub async fn with_fetcher(config: Config, fetcher: Arc<dyn MediaFetcher>) -> Result<Self> {
        config.validate()?;

        create_dir(&config.storage.download_dir, "download").await?;
        create_dir(&config.storage.cache_dir, "cache").await?;

        tracing::info!(fetcher = fetcher.name(), "Media fetcher initialized");

        let paths = PathResolver::new(&config.storage.download_dir);
        let cache = MetadataCache::new(&config.storage.cache_dir, config.storage.cache_ttl);
        let catalog = Catalog::new(cache, fetcher.clone(), paths.clone());

        Ok(Self {
            config: Arc::new(config),
            registry: TaskRegistry::new(),
            paths,
            catalog,
            fetcher,
            accepting_new: Arc::new(AtomicBool::new(true)),
            shutdown_token: CancellationToken::new(),
        })
    }

    /// Configuration the broker was built with
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Shared task registry
    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Artifact path resolver
    pub fn paths(&self) -> &PathResolver {
        &self.paths
    }

    /// Metadata lookups
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Name of the active fetcher
    pub fn fetcher_name(&self) -> &'static str {
        self.fetcher.name()
    }

    /// Spawn the API server in a background task
    ///
    /// Binds to the address in `config.server.api.bind_address`.
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let broker = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(broker, config).await })
    }
}

async fn create_dir(path: &Path, what: &str) -> Result<()> {
    tokio::fs::create_dir_all(path).await.map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!(
                "Failed to create {} directory '{}': {}",
                what,
                path.display(),
                e
            ),
        ))
    })
}
