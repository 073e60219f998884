//! NeuChain execution node binary
//!
//! Runs a random transfer workload through the deterministic execution
//! engine and prints the engine metrics as JSON.

mod cli;
mod config;
mod driver;

use anyhow::Result;
use cli::Cli;
use config::{NodeConfig, StorageBackend, StorageConfig};
use driver::{Driver, Engine};
use neu_storage::{DbConnection, MemoryDb};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    tracing::info!("NeuChain node starting...");

    let mut config = match &cli.config {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::default(),
    };
    config.apply_cli(&cli);
    config.validate()?;
    tracing::info!(
        workers = config.scheduler.worker_count,
        variant = %config.scheduler.variant,
        backend = ?config.storage.backend,
        "configuration loaded"
    );

    let db = open_storage(&config.storage)?;
    let engine = Engine::new(&config.scheduler, Arc::clone(&db))?;
    let mut driver = Driver::new(engine, db, config.workload.clone());
    let report = driver.run()?;

    tracing::info!(
        batches = report.batches.len(),
        committed = report.committed(),
        pending = report.pending,
        total = report.final_total,
        "workload finished, balance conserved"
    );

    let snapshot = driver.engine().metrics().snapshot();
    println!("{}", snapshot.to_json()?);

    tracing::info!("NeuChain node stopped");
    Ok(())
}

/// Open the configured storage backend
fn open_storage(config: &StorageConfig) -> Result<Arc<dyn DbConnection>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryDb::new("neuchain"))),
        #[cfg(feature = "rocksdb")]
        StorageBackend::Rocksdb => {
            let mut db = neu_storage::RocksDb::new(&config.path);
            db.open()?;
            tracing::info!("Opened rocksdb at {:?}", config.path);
            Ok(Arc::new(db))
        }
        #[cfg(not(feature = "rocksdb"))]
        StorageBackend::Rocksdb => {
            anyhow::bail!("neuchain was built without the rocksdb feature")
        }
    }
}
