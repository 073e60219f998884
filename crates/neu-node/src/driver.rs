//! Transfer workload driver
//!
//! Seeds accounts through the `transfer` chaincode, then pushes batches of
//! random transfers through the coordinator. Transactions aborted by a
//! conflict keep their id and are resubmitted at the head of the next batch.

use crate::config::WorkloadConfig;
use anyhow::{bail, Context, Result};
use neu_metrics::Metrics;
use neu_primitives::TxId;
use neu_scheduler::{AriaCoordinator, EngineVariant, SchedulerConfig, SchedulerResult, WbCoordinator};
use neu_storage::DbConnection;
use neu_types::{Envelope, ExecutionResult, Transaction, UserRequest};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;

/// Coordinator of either reservation scheme
pub enum Engine {
    /// Single commit round
    Aria(AriaCoordinator),
    /// Two commit rounds
    WriteBased(WbCoordinator),
}

impl Engine {
    /// Start the worker pool described by `config`
    pub fn new(config: &SchedulerConfig, db: Arc<dyn DbConnection>) -> SchedulerResult<Self> {
        config.validate()?;
        Ok(match config.variant {
            EngineVariant::Aria => Engine::Aria(AriaCoordinator::new(config.worker_count, db)?),
            EngineVariant::WriteBased => {
                Engine::WriteBased(WbCoordinator::new(config.worker_count, db)?)
            }
        })
    }

    /// Run one batch
    pub fn process_batch(&mut self, batch: &mut Vec<Transaction>) -> SchedulerResult<()> {
        match self {
            Engine::Aria(c) => c.process_batch(batch),
            Engine::WriteBased(c) => c.process_batch(batch),
        }
    }

    /// Engine metrics
    pub fn metrics(&self) -> Arc<Metrics> {
        match self {
            Engine::Aria(c) => c.metrics(),
            Engine::WriteBased(c) => c.metrics(),
        }
    }
}

/// Verdict counts of one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Batch index
    pub index: usize,
    /// Transactions in the batch, retries included
    pub size: usize,
    /// Committed
    pub committed: usize,
    /// Aborted by a conflict, resubmitted
    pub aborted: usize,
    /// Failed during execution
    pub rejected: usize,
}

/// Outcome of a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Per-batch counts
    pub batches: Vec<BatchReport>,
    /// Sum of all balances after seeding
    pub initial_total: i64,
    /// Sum of all balances at the end
    pub final_total: i64,
    /// Aborted transactions left after the last batch
    pub pending: usize,
}

impl RunReport {
    /// Committed transactions over all batches
    pub fn committed(&self) -> usize {
        self.batches.iter().map(|b| b.committed).sum()
    }
}

/// Drives a transfer workload through an engine
pub struct Driver {
    engine: Engine,
    db: Arc<dyn DbConnection>,
    workload: WorkloadConfig,
    rng: StdRng,
    next_id: u64,
}

impl Driver {
    /// Create a driver over an engine sharing `db`
    pub fn new(engine: Engine, db: Arc<dyn DbConnection>, workload: WorkloadConfig) -> Self {
        let rng = StdRng::seed_from_u64(workload.seed);
        Self {
            engine,
            db,
            workload,
            rng,
            next_id: 0,
        }
    }

    /// The engine
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    fn transaction(&mut self, request: UserRequest) -> Result<Transaction> {
        let id = TxId::from_u64(self.next_id);
        self.next_id += 1;
        let envelope = Envelope::with_digest(&request, id)?;
        Ok(Transaction::from_envelope(envelope)?)
    }

    /// Seed every account with balance zero
    pub fn seed_accounts(&mut self) -> Result<()> {
        let request = UserRequest::new("transfer", "init", [self.workload.accounts.to_string()]);
        let mut batch = vec![self.transaction(request)?];
        self.engine.process_batch(&mut batch)?;
        if batch[0].execution_result() != ExecutionResult::Commit {
            bail!("account seeding ended with {:?}", batch[0].execution_result());
        }
        tracing::info!(accounts = self.workload.accounts, "accounts seeded");
        Ok(())
    }

    fn random_transfer(&mut self) -> Result<Transaction> {
        let accounts = self.workload.accounts;
        let from = self.rng.gen_range(0..accounts);
        let to = (from + 1 + self.rng.gen_range(0..accounts - 1)) % accounts;
        let request = UserRequest::new(
            "transfer",
            "transfer",
            [from.to_string(), to.to_string(), self.workload.amount.to_string()],
        );
        self.transaction(request)
    }

    /// Sum of all account balances
    pub fn total_balance(&self) -> Result<i64> {
        let mut total = 0i64;
        for account in 0..self.workload.accounts {
            let key = account.to_string();
            let value = self
                .db
                .get(key.as_bytes())?
                .with_context(|| format!("account {} missing", account))?;
            let balance: i64 = std::str::from_utf8(&value)
                .ok()
                .and_then(|s| s.parse().ok())
                .with_context(|| format!("account {} holds a non-numeric balance", account))?;
            total += balance;
        }
        Ok(total)
    }

    /// Seed, run every batch and check that no balance was created or lost
    pub fn run(&mut self) -> Result<RunReport> {
        self.seed_accounts()?;
        let mut report = RunReport {
            initial_total: self.total_balance()?,
            ..Default::default()
        };

        let mut retry: Vec<Transaction> = Vec::new();
        for index in 0..self.workload.batches {
            let mut batch = std::mem::take(&mut retry);
            while batch.len() < self.workload.batch_size {
                batch.push(self.random_transfer()?);
            }
            self.engine
                .process_batch(&mut batch)
                .with_context(|| format!("batch {} failed", index))?;

            let mut stats = BatchReport {
                index,
                size: batch.len(),
                ..Default::default()
            };
            for txn in batch {
                match txn.execution_result() {
                    ExecutionResult::Commit => stats.committed += 1,
                    ExecutionResult::Abort => {
                        stats.aborted += 1;
                        retry.push(txn);
                    }
                    ExecutionResult::AbortNoRetry | ExecutionResult::Pending => stats.rejected += 1,
                }
            }
            tracing::info!(
                batch = index,
                size = stats.size,
                committed = stats.committed,
                aborted = stats.aborted,
                rejected = stats.rejected,
                "batch finished"
            );
            report.batches.push(stats);
        }

        report.pending = retry.len();
        report.final_total = self.total_balance()?;
        if report.final_total != report.initial_total {
            bail!(
                "balance not conserved: {} before, {} after",
                report.initial_total,
                report.final_total
            );
        }
        Ok(report)
    }
}
