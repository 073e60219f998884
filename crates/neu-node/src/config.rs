//! Configuration types for neu-node

use crate::cli::Cli;
use anyhow::{Context, Result};
use clap::ValueEnum;
use neu_chaincode::DEFAULT_AMOUNT;
use neu_scheduler::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Node configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Execution engine
    pub scheduler: SchedulerConfig,
    /// Storage backend
    pub storage: StorageConfig,
    /// Transfer workload
    pub workload: WorkloadConfig,
}

/// Storage backend kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-memory, lost on exit
    #[default]
    Memory,
    /// RocksDB (requires the `rocksdb` feature)
    Rocksdb,
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend kind
    pub backend: StorageBackend,
    /// Database directory, used by rocksdb
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: PathBuf::from("./data"),
        }
    }
}

/// Random transfer workload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Accounts seeded by `transfer init`
    pub accounts: u64,
    /// Transactions per batch
    pub batch_size: usize,
    /// Number of batches
    pub batches: usize,
    /// Amount moved by each transfer
    pub amount: i64,
    /// Random seed
    pub seed: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            accounts: 1_000,
            batch_size: 1_000,
            batches: 10,
            amount: DEFAULT_AMOUNT,
            seed: 42,
        }
    }
}

impl NodeConfig {
    /// Load a configuration file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        tracing::info!("Loading config from {:?}", path);
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Override fields set on the command line
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(workers) = cli.workers {
            self.scheduler.worker_count = workers;
        }
        if let Some(variant) = cli.variant {
            self.scheduler.variant = variant.into();
        }
        if let Some(backend) = cli.db {
            self.storage.backend = backend;
        }
        if let Some(path) = &cli.db_path {
            self.storage.path = path.clone();
        }
        if let Some(accounts) = cli.accounts {
            self.workload.accounts = accounts;
        }
        if let Some(batch_size) = cli.batch_size {
            self.workload.batch_size = batch_size;
        }
        if let Some(batches) = cli.batches {
            self.workload.batches = batches;
        }
        if let Some(seed) = cli.seed {
            self.workload.seed = seed;
        }
    }

    /// Reject values the node cannot run with
    pub fn validate(&self) -> Result<()> {
        self.scheduler.validate()?;
        anyhow::ensure!(self.workload.accounts >= 2, "need at least 2 accounts");
        anyhow::ensure!(self.workload.batch_size > 0, "batch size must be positive");
        Ok(())
    }
}
