//! # media-cache-broker
//!
//! Fetch-then-cache broker for remote media artifacts.
//!
//! ## Design Philosophy
//!
//! media-cache-broker is designed to be:
//! - **One task per resource** - Concurrent requests for the same resource share one fetch
//! - **Disk first** - Artifacts already on disk are served without touching the network
//! - **Self-cleaning** - A janitor expires old artifacts while protecting live ones
//! - **Pluggable** - The external fetcher sits behind a trait
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_cache_broker::{MediaBroker, Config, TaskStatus};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broker = MediaBroker::new(Config::default()).await?;
//!
//!     let ticket = broker.request_download("dQw4w9WgXcQ").await?;
//!     println!("task {} is {}", ticket.task.id, ticket.task.status);
//!
//!     loop {
//!         let task = broker.status("dQw4w9WgXcQ").await?;
//!         if task.status != TaskStatus::Pending && task.status != TaskStatus::Downloading {
//!             break;
//!         }
//!         tokio::time::sleep(std::time::Duration::from_secs(1)).await;
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Broker facade (decomposed into focused submodules)
pub mod broker;
/// Cached video and channel metadata lookups
pub mod catalog;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// External media fetcher abstraction
pub mod fetcher;
/// Periodic artifact and cache expiry
pub mod janitor;
/// File-backed metadata cache
pub mod metadata_cache;
/// Artifact naming and resolution
pub mod paths;
/// In-memory task registry
pub mod registry;
/// Core types
pub mod types;
/// Per-resource download worker
pub mod worker;

// Re-export commonly used types
pub use broker::{DownloadOutcome, DownloadTicket, MediaBroker};
pub use config::Config;
pub use error::{ApiError, Error, ErrorDetail, Result, TaskError, ToHttpStatus};
pub use fetcher::{MediaFetcher, NoOpFetcher, YtDlpFetcher};
pub use registry::TaskRegistry;
pub use types::{
    ArtifactKind, ChannelInfo, CleanupReport, HealthReport, Task, TaskId, TaskSnapshot,
    TaskStatus, VideoInfo,
};

/// Helper function to run the broker with graceful signal handling.
///
/// Waits for a termination signal and then calls the broker's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use media_cache_broker::{MediaBroker, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let broker = MediaBroker::new(Config::default()).await?;
///     broker.start_janitor();
///
///     run_with_shutdown(&broker).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(broker: &MediaBroker) -> Result<()> {
    wait_for_signal().await;
    broker.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
