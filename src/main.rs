use clap::Parser;
use media_cache_broker::{Config, MediaBroker, run_with_shutdown};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Fetch-then-cache media broker
#[derive(Debug, Parser)]
#[command(name = "media-cache-broker", version, about)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the API bind address (e.g. 0.0.0.0:5000)
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(Cli::parse()).await {
        tracing::error!(error = %e, "media-cache-broker exited with an error");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> media_cache_broker::Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.api.bind_address = bind;
    }

    tracing::info!(
        download_dir = %config.storage.download_dir.display(),
        cache_dir = %config.storage.cache_dir.display(),
        cache_ttl_secs = config.storage.cache_ttl.as_secs(),
        "Starting media-cache-broker"
    );

    let broker = Arc::new(MediaBroker::new(config).await?);
    let janitor = broker.start_janitor();
    let api = broker.spawn_api_server();

    tokio::select! {
        result = run_with_shutdown(&broker) => result?,
        joined = api => {
            // server stopped on its own; still drain workers before exiting
            broker.shutdown().await?;
            match joined {
                Ok(result) => result?,
                Err(e) => return Err(media_cache_broker::Error::ApiServerError(e.to_string())),
            }
        }
    }

    if let Err(e) = janitor.await {
        tracing::warn!(error = %e, "Janitor task ended abnormally");
    }
    Ok(())
}
