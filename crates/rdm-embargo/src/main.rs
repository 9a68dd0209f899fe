//! rdm-embargo job binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, and lifts every embargo whose date has passed. Runs a
//! single pass with `--once`; otherwise repeats every `interval_secs` until
//! interrupted.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use rdm_embargo::{JobConfig, lift_expired};
use rdm_service::RecordService;
use rdm_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Lift expired record embargos")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Run a single pass and exit.
  #[arg(long)]
  once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("RDM")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read config file")?;

  let job_cfg: JobConfig = settings
    .try_deserialize()
    .context("failed to deserialise JobConfig")?;

  let store_path = job_cfg.resolved_store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let service = RecordService::new(Arc::new(store), job_cfg.service.clone());

  if cli.once {
    lift_expired(&service).await.context("embargo pass failed")?;
    return Ok(());
  }

  tracing::info!(interval_secs = job_cfg.interval_secs, "starting embargo job");
  let mut ticker = tokio::time::interval(Duration::from_secs(job_cfg.interval_secs.max(1)));
  loop {
    tokio::select! {
      _ = ticker.tick() => {
        // A failed scan is retried on the next tick.
        if let Err(e) = lift_expired(&service).await {
          tracing::error!(error = %e, "embargo pass failed");
        }
      }
      _ = tokio::signal::ctrl_c() => {
        tracing::info!("shutting down");
        return Ok(());
      }
    }
  }
}
