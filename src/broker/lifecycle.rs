//! Startup and shutdown coordination.

use crate::error::Result;
use std::sync::atomic::Ordering;

use super::MediaBroker;

impl MediaBroker {
    /// Gracefully shut down the broker
    ///
    /// 1. Stops accepting new downloads
    /// 2. Stops the janitor and cancels every live task
    /// 3. Waits up to `tasks.shutdown_timeout` for workers to exit
    ///
    /// Workers still running after the timeout are left to finish on their
    /// own; their results are discarded because their tasks are cancelled.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new downloads");

        self.shutdown_token.cancel();
        let cancelled = self.registry.cancel_all().await;
        tracing::info!(cancelled, "Signaled cancellation to all live tasks");

        let timeout = self.config.tasks.shutdown_timeout;
        match tokio::time::timeout(timeout, self.wait_for_workers()).await {
            Ok(()) => tracing::info!("All workers exited"),
            Err(_) => tracing::warn!(
                remaining = self.registry.worker_count().await,
                "Timeout waiting for workers to exit, proceeding with shutdown"
            ),
        }

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether new downloads are still accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }

    async fn wait_for_workers(&self) {
        loop {
            let active_count = self.registry.worker_count().await;
            if active_count == 0 {
                return;
            }

            tracing::debug!(active_count, "Waiting for workers to exit");
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}
