//! Chaincode-executing worker state machine

use crate::strategy::ReservationStrategy;
use crate::worker::{ReceiverState, WorkerStateMachine};
use neu_chaincode::{Chaincode, ChaincodeRegistry, ChaincodeResult, Orm};
use neu_primitives::WorkerId;
use neu_storage::DbConnection;
use neu_types::{ExecutionResult, Transaction};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Worker state machine generic over the reservation strategy
///
/// Holds the worker's share of the current batch. The coordinator fills
/// `txn_list` right after `on_create` and takes it back after the last
/// commit round.
pub struct AriaWorkerFsm<S: ReservationStrategy> {
    id: WorkerId,
    txn_list: Vec<Transaction>,
    registry: Arc<ChaincodeRegistry>,
    chaincodes: HashMap<String, Box<dyn Chaincode>>,
    db: Arc<dyn DbConnection>,
    strategy: Arc<S>,
    commit_round: usize,
}

impl<S: ReservationStrategy> AriaWorkerFsm<S> {
    /// Create a state machine for worker `id`
    pub fn new(
        id: WorkerId,
        registry: Arc<ChaincodeRegistry>,
        db: Arc<dyn DbConnection>,
        strategy: Arc<S>,
    ) -> Self {
        Self {
            id,
            txn_list: Vec::new(),
            registry,
            chaincodes: HashMap::new(),
            db,
            strategy,
            commit_round: 0,
        }
    }

    /// Worker id
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Transactions assigned to this worker
    pub fn txn_list(&self) -> &[Transaction] {
        &self.txn_list
    }

    /// Mutable access to the assigned transactions
    pub fn txn_list_mut(&mut self) -> &mut Vec<Transaction> {
        &mut self.txn_list
    }

    /// Take the assigned transactions out
    pub fn take_txn_list(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.txn_list)
    }

    /// Storage handle
    pub fn db(&self) -> &Arc<dyn DbConnection> {
        &self.db
    }

    /// Replace the storage handle
    pub fn set_db(&mut self, db: Arc<dyn DbConnection>) {
        self.db = db;
    }

    /// Replace the reservation strategy
    pub fn set_strategy(&mut self, strategy: Arc<S>) {
        self.strategy = strategy;
    }

    /// Replace the chaincode registry and drop cached instances
    pub fn set_registry(&mut self, registry: Arc<ChaincodeRegistry>) {
        self.registry = registry;
        self.chaincodes.clear();
    }
}

/// Run the chaincode of `txn` and store its read/write sets
fn run_chaincode(
    chaincodes: &mut HashMap<String, Box<dyn Chaincode>>,
    registry: &ChaincodeRegistry,
    db: &dyn DbConnection,
    txn: &mut Transaction,
) -> ChaincodeResult<()> {
    let request = txn.request();
    let chaincode = match chaincodes.entry(request.cc_name.clone()) {
        Entry::Occupied(entry) => entry.into_mut(),
        Entry::Vacant(entry) => entry.insert(registry.instantiate(&request.cc_name)?),
    };
    let mut orm = Orm::new(db);
    let result = chaincode.invoke(&mut orm, &request.func_name, &request.args);
    let (reads, writes, ret_value) = orm.into_rw_sets();
    txn.set_rw_sets(reads, writes);
    txn.set_ret_value(ret_value);
    result
}

impl<S: ReservationStrategy> WorkerStateMachine for AriaWorkerFsm<S> {
    fn on_create(&mut self) -> ReceiverState {
        self.txn_list.clear();
        self.commit_round = 0;
        ReceiverState::Ready
    }

    fn on_execute_transaction(&mut self) -> ReceiverState {
        for txn in self.txn_list.iter_mut() {
            if txn.execution_result() == ExecutionResult::AbortNoRetry {
                continue;
            }
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                run_chaincode(&mut self.chaincodes, &self.registry, self.db.as_ref(), txn)
            }));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(
                        worker = self.id,
                        txn = %txn.id(),
                        cc = %txn.request().cc_name,
                        error = %e,
                        "chaincode failed"
                    );
                    txn.set_execution_result(ExecutionResult::AbortNoRetry);
                    continue;
                }
                Err(_) => {
                    tracing::error!(
                        worker = self.id,
                        txn = %txn.id(),
                        cc = %txn.request().cc_name,
                        "chaincode panicked"
                    );
                    // the cached instance may be half updated
                    self.chaincodes.remove(&txn.request().cc_name);
                    txn.set_execution_result(ExecutionResult::AbortNoRetry);
                    continue;
                }
            }
            // read only, nothing to reserve
            if txn.writes().is_empty() {
                txn.set_execution_result(ExecutionResult::Commit);
                continue;
            }
            self.strategy.reserve(txn);
        }
        tracing::debug!(worker = self.id, txns = self.txn_list.len(), "exec finished");
        ReceiverState::FinishedExec
    }

    fn on_commit_transaction(&mut self) -> ReceiverState {
        let round = self.commit_round;
        self.commit_round = (round + 1) % S::COMMIT_ROUNDS;

        let strategy = &self.strategy;
        let txn_list = &mut self.txn_list;
        let mut staged = 0;
        let result = self.db.sync_write_batch(&mut |batch| {
            for txn in txn_list.iter_mut() {
                if txn.execution_result() == ExecutionResult::AbortNoRetry {
                    continue;
                }
                if round == 0 && txn.writes().is_empty() {
                    txn.set_execution_result(ExecutionResult::Commit);
                    continue;
                }
                strategy.commit(round, txn, batch);
            }
            staged = batch.len();
            true
        });

        match result {
            Ok(()) => {
                tracing::debug!(worker = self.id, round, staged, "commit finished");
                ReceiverState::FinishedCommit
            }
            Err(e) => {
                tracing::error!(worker = self.id, round, staged, error = %e, "failed to write commit batch");
                ReceiverState::Failed
            }
        }
    }

    fn on_destroy(&mut self) -> ReceiverState {
        self.chaincodes.clear();
        tracing::debug!(worker = self.id, "state machine destroyed");
        ReceiverState::Exited
    }
}
