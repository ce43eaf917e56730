use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use live_monitor::{
    actors::MonitorHandle,
    api::{ApiState, spawn_api_server},
    config::{Config, StorageConfig, read_config_file},
    source::CloudflareSource,
    storage::{MemoryStore, StateStore},
};
use tracing::{info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (JSON); defaults and environment are used when omitted
    #[arg(short)]
    file: Option<String>,

    /// Only log info and above
    #[arg(short, long)]
    quiet: bool,
}

fn init(quiet: bool) {
    let level = if quiet { LevelFilter::INFO } else { LevelFilter::TRACE };
    let filter = filter::Targets::new().with_targets(vec![
        ("live_monitor", level),
        ("tower_http", LevelFilter::DEBUG.min(level)),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    init(args.quiet);
    trace!("started with args: {args:?}");

    let config = match &args.file {
        Some(path) => read_config_file(path)?,
        None => Config::default(),
    }
    .with_env_fallback();
    config.validate()?;

    let backend = open_backend(&config.storage.clone().unwrap_or_default()).await?;
    let source = Arc::new(CloudflareSource::new(&config.upstream)?);

    let monitor = MonitorHandle::spawn(config.monitor.clone(), source, backend).await;

    let addr = spawn_api_server(config.api.clone(), ApiState::new(monitor.clone())).await?;
    info!(
        "serving on http://{addr} (poll every {}ms, {} minutes of history)",
        config.monitor.poll_interval_ms, config.monitor.history_minutes
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    info!("shutting down");
    monitor.shutdown().await?;

    Ok(())
}

async fn open_backend(config: &StorageConfig) -> anyhow::Result<Box<dyn StateStore>> {
    match config {
        StorageConfig::None => {
            warn!("no storage configured, history is lost on restart");
            Ok(Box::new(MemoryStore::new()))
        }
        #[cfg(feature = "storage-sqlite")]
        StorageConfig::Sqlite { path } => {
            let store = live_monitor::storage::sqlite::SqliteStore::new(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "storage-sqlite"))]
        StorageConfig::Sqlite { .. } => {
            anyhow::bail!("sqlite storage requested but the storage-sqlite feature is disabled")
        }
    }
}
