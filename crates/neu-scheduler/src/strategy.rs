//! Reservation strategies plugged into the worker state machine

use crate::reserve_table::ReserveTable;
use crate::wb_reserve_table::WbReserveTable;
use neu_storage::WriteBatch;
use neu_types::{ExecutionResult, Kv, Transaction};

/// Stage one write: an empty value deletes the key
pub(crate) fn stage_write(kv: &Kv, batch: &mut WriteBatch) {
    if kv.is_tombstone() {
        batch.delete(kv.key.clone());
    } else {
        batch.put(kv.key.clone(), kv.value.clone());
    }
}

/// How a batch reserves keys during exec and decides verdicts during commit
///
/// One instance is shared by every worker of a coordinator, so all methods
/// take `&self` and must tolerate concurrent calls within a phase.
pub trait ReservationStrategy: Default + Send + Sync + 'static {
    /// Thread name prefix of the workers
    const WORKER_NAME: &'static str;

    /// Commit rounds per batch (at least 1)
    const COMMIT_ROUNDS: usize;

    /// Clear all reservations before a new batch
    fn reset(&self);

    /// Record the keys of an executed transaction that has writes
    fn reserve(&self, txn: &Transaction);

    /// Run commit round `round` for one transaction
    ///
    /// Sets the verdict and stages the writes that must reach storage.
    /// Never called for `AbortNoRetry` transactions, nor for read-only
    /// transactions in round 0.
    fn commit(&self, round: usize, txn: &mut Transaction, batch: &mut WriteBatch);
}

/// Single commit round over min-wins read and write tables
#[derive(Debug, Default)]
pub struct MinWinsSingleRound {
    table: ReserveTable,
}

impl MinWinsSingleRound {
    /// The reservation table
    pub fn table(&self) -> &ReserveTable {
        &self.table
    }
}

impl ReservationStrategy for MinWinsSingleRound {
    const WORKER_NAME: &'static str = "aria_worker";
    const COMMIT_ROUNDS: usize = 1;

    fn reset(&self) {
        self.table.reset();
    }

    fn reserve(&self, txn: &Transaction) {
        self.table.reserve(txn.reads(), txn.writes(), txn.id());
    }

    fn commit(&self, _round: usize, txn: &mut Transaction, batch: &mut WriteBatch) {
        let verdict = self
            .table
            .analyze_dependency(txn.reads(), txn.writes(), txn.id())
            .verdict();
        if verdict.is_commit() {
            for kv in txn.writes() {
                stage_write(kv, batch);
            }
        }
        txn.set_execution_result(verdict);
    }
}

/// Two commit rounds over the write-based tables
///
/// Round 0 aborts transactions with a read-after-write dependency and marks
/// the rest committed. Round 1 writes each key from its `rs` owner only.
#[derive(Debug, Default)]
pub struct MinMaxWinsTwoRound {
    table: WbReserveTable,
}

impl MinMaxWinsTwoRound {
    /// The reservation table
    pub fn table(&self) -> &WbReserveTable {
        &self.table
    }
}

impl ReservationStrategy for MinMaxWinsTwoRound {
    const WORKER_NAME: &'static str = "wb_worker";
    const COMMIT_ROUNDS: usize = 2;

    fn reset(&self) {
        self.table.reset();
    }

    fn reserve(&self, txn: &Transaction) {
        self.table.reserve_writes(txn.writes(), txn.id());
    }

    fn commit(&self, round: usize, txn: &mut Transaction, batch: &mut WriteBatch) {
        if round == 0 {
            if self.table.detect_raw(txn.reads(), txn.id()) {
                txn.set_execution_result(ExecutionResult::Abort);
                return;
            }
            self.table.mvcc_reserve_writes(txn.writes(), txn.id());
            txn.set_execution_result(ExecutionResult::Commit);
        } else if txn.execution_result().is_commit() {
            self.table.update_db(txn.writes(), txn.id(), batch);
        }
    }
}
