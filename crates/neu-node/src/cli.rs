//! CLI argument parsing for neu-node

use crate::config::StorageBackend;
use clap::{Parser, ValueEnum};
use neu_scheduler::EngineVariant;
use std::path::PathBuf;

/// Reservation scheme selectable from the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum VariantArg {
    /// Single commit round
    Aria,
    /// Two commit rounds
    #[value(name = "write_based")]
    WriteBased,
}

impl From<VariantArg> for EngineVariant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Aria => EngineVariant::Aria,
            VariantArg::WriteBased => EngineVariant::WriteBased,
        }
    }
}

/// NeuChain execution node
///
/// Options left unset keep the value from `--config`, or the built-in
/// default when no config file is given.
#[derive(Parser, Debug, Clone)]
#[command(name = "neuchain")]
#[command(about = "NeuChain deterministic execution node")]
#[command(version)]
pub struct Cli {
    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of worker threads
    #[arg(long)]
    pub workers: Option<usize>,

    /// Reservation scheme
    #[arg(long, value_enum)]
    pub variant: Option<VariantArg>,

    /// Number of accounts seeded before the workload
    #[arg(long)]
    pub accounts: Option<u64>,

    /// Transactions per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Number of batches to run
    #[arg(long)]
    pub batches: Option<usize>,

    /// Storage backend
    #[arg(long, value_enum)]
    pub db: Option<StorageBackend>,

    /// Storage path (rocksdb only)
    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Workload random seed
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
