//! Coordinator driving the worker pool through the batch phases

use crate::error::{SchedulerError, SchedulerResult};
use crate::fsm::AriaWorkerFsm;
use crate::strategy::{MinMaxWinsTwoRound, MinWinsSingleRound, ReservationStrategy};
use crate::worker::{InvokerCommand, ReceiverState, Worker};
use crossbeam_channel::bounded;
use neu_chaincode::ChaincodeRegistry;
use neu_metrics::{timed, Metrics};
use neu_primitives::WorkerId;
use neu_storage::DbConnection;
use neu_types::{Envelope, ExecutionResult, Transaction, TxReadWriteSet};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Single commit round coordinator
pub type AriaCoordinator = Coordinator<MinWinsSingleRound>;

/// Two commit round (write-based) coordinator
pub type WbCoordinator = Coordinator<MinMaxWinsTwoRound>;

type PhaseHook<S> = Arc<dyn Fn(WorkerId, &mut AriaWorkerFsm<S>) + Send + Sync>;
type Slots = Arc<Mutex<Vec<Option<Transaction>>>>;

/// Outcome of one request of `process_validated_requests`
#[derive(Clone, Debug)]
pub struct ProcessedRequest {
    /// The request envelope
    pub envelope: Envelope,
    /// Read/write sets and verdict
    pub rw_set: TxReadWriteSet,
    /// Whether the writes were applied
    pub committed: bool,
}

struct PhaseAck {
    worker: WorkerId,
    state: ReceiverState,
}

/// Runs batches on a fixed pool of workers sharing one reservation strategy
///
/// Transaction `i` of a batch goes to worker `i % n`. Every phase is a
/// broadcast followed by a barrier: the coordinator waits until all workers
/// have acknowledged before moving on.
pub struct Coordinator<S: ReservationStrategy> {
    workers: Vec<Worker<AriaWorkerFsm<S>>>,
    strategy: Arc<S>,
    metrics: Arc<Metrics>,
}

impl<S: ReservationStrategy> Coordinator<S> {
    /// Start `worker_count` workers with the built-in chaincodes
    pub fn new(worker_count: usize, db: Arc<dyn DbConnection>) -> SchedulerResult<Self> {
        Self::with_registry(worker_count, db, Arc::new(ChaincodeRegistry::with_builtins()))
    }

    /// Start `worker_count` workers with a custom chaincode registry
    pub fn with_registry(
        worker_count: usize,
        db: Arc<dyn DbConnection>,
        registry: Arc<ChaincodeRegistry>,
    ) -> SchedulerResult<Self> {
        if worker_count == 0 {
            return Err(SchedulerError::InvalidWorkerCount(worker_count));
        }
        let strategy = Arc::new(S::default());
        let mut workers = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let fsm = AriaWorkerFsm::new(
                id,
                Arc::clone(&registry),
                Arc::clone(&db),
                Arc::clone(&strategy),
            );
            let mut worker = Worker::new(id, fsm);
            // already started workers are joined on drop
            worker.check_and_start_service(&format!("{}-{}", S::WORKER_NAME, id))?;
            workers.push(worker);
        }

        let metrics = Arc::new(Metrics::new());
        metrics.set_gauge("scheduler.workers", worker_count as i64);
        tracing::info!(workers = worker_count, kind = S::WORKER_NAME, "coordinator started");
        Ok(Self {
            workers,
            strategy,
            metrics,
        })
    }

    /// Number of workers
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// The shared reservation strategy
    ///
    /// Reservations of the last batch stay readable until the next one
    /// starts.
    pub fn strategy(&self) -> &Arc<S> {
        &self.strategy
    }

    /// Engine metrics
    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Run a batch
    ///
    /// On `Ok` every transaction has a terminal verdict and committed writes
    /// are in storage. On `Err` the batch is in an undefined state and must
    /// not be retried as is. In both cases `batch` holds every transaction
    /// again; on `Ok` in input order.
    ///
    /// One batch or custom command at a time: each phase rewires the
    /// worker callbacks.
    pub fn process_batch(&mut self, batch: &mut Vec<Transaction>) -> SchedulerResult<()> {
        let n = self.workers.len();
        let len = batch.len();
        self.strategy.reset();

        let slots: Slots = Arc::new(Mutex::new(batch.drain(..).map(Some).collect()));
        let result = self.run_phases(&slots);
        if result.is_err() {
            self.reclaim(&slots);
        }

        let mut slots = slots.lock();
        batch.extend(slots.drain(..).flatten());
        drop(slots);

        match &result {
            Ok(()) => {
                self.record_verdicts(batch);
                tracing::debug!(txns = len, workers = n, "batch finished");
            }
            Err(e) => {
                self.metrics.incr("scheduler.batch_failures", 1);
                tracing::error!(txns = len, error = %e, "batch failed");
            }
        }
        if batch.len() != len {
            tracing::error!(expected = len, got = batch.len(), "transactions lost");
        }
        self.metrics.incr("scheduler.batches", 1);
        result
    }

    /// Run `hook` on every worker's state machine under the phase barrier
    pub fn invoke_custom_command<H>(&mut self, hook: H) -> SchedulerResult<()>
    where
        H: Fn(WorkerId, &mut AriaWorkerFsm<S>) + Send + Sync + 'static,
    {
        self.process_parallel(
            InvokerCommand::Custom,
            ReceiverState::FinishedCustom,
            Some(Arc::new(hook)),
        )
    }

    /// Point every worker at a new storage handle
    pub fn set_db(&mut self, db: Arc<dyn DbConnection>) -> SchedulerResult<()> {
        self.invoke_custom_command(move |_, fsm| fsm.set_db(Arc::clone(&db)))
    }

    /// Install a fresh reservation strategy in every worker
    pub fn reset_reserve_table(&mut self) -> SchedulerResult<()> {
        let strategy = Arc::new(S::default());
        let installed = Arc::clone(&strategy);
        self.invoke_custom_command(move |_, fsm| fsm.set_strategy(Arc::clone(&installed)))?;
        self.strategy = strategy;
        Ok(())
    }

    /// Decode envelopes, run them as one batch and report per request
    ///
    /// Undecodable envelopes come back as `AbortNoRetry`. Results are in
    /// input order.
    pub fn process_validated_requests(
        &mut self,
        envelopes: Vec<Envelope>,
    ) -> SchedulerResult<Vec<ProcessedRequest>> {
        let mut batch: Vec<Transaction> = envelopes
            .into_iter()
            .map(|envelope| match Transaction::from_envelope(envelope.clone()) {
                Ok(txn) => txn,
                Err(e) => {
                    tracing::warn!(digest = %envelope.digest(), error = %e, "undecodable request");
                    Transaction::rejected(envelope)
                }
            })
            .collect();
        self.process_batch(&mut batch)?;
        Ok(batch
            .into_iter()
            .map(|txn| {
                let (envelope, rw_set) = txn.into_parts();
                ProcessedRequest {
                    committed: rw_set.ret_code.is_commit(),
                    envelope,
                    rw_set,
                }
            })
            .collect())
    }

    fn run_phases(&self, slots: &Slots) -> SchedulerResult<()> {
        let n = self.workers.len();

        let start_slots = Arc::clone(slots);
        let distribute: PhaseHook<S> = Arc::new(move |id: WorkerId, fsm: &mut AriaWorkerFsm<S>| {
            let mut slots = start_slots.lock();
            let list = fsm.txn_list_mut();
            for pos in (id..slots.len()).step_by(n) {
                if let Some(mut txn) = slots[pos].take() {
                    txn.prepare_for_batch();
                    list.push(txn);
                }
            }
        });
        timed!(self.metrics, "scheduler.phase.start_us", {
            self.process_parallel(InvokerCommand::Start, ReceiverState::Ready, Some(distribute))
        })?;

        timed!(self.metrics, "scheduler.phase.exec_us", {
            self.process_parallel(InvokerCommand::Exec, ReceiverState::FinishedExec, None)
        })?;

        let commit_slots = Arc::clone(slots);
        let recombine: PhaseHook<S> = Arc::new(move |id: WorkerId, fsm: &mut AriaWorkerFsm<S>| {
            let mut slots = commit_slots.lock();
            for (k, txn) in fsm.take_txn_list().into_iter().enumerate() {
                slots[id + k * n] = Some(txn);
            }
        });
        timed!(self.metrics, "scheduler.phase.commit_us", {
            let mut result = Ok(());
            for round in 0..S::COMMIT_ROUNDS {
                let hook = (round + 1 == S::COMMIT_ROUNDS).then(|| Arc::clone(&recombine));
                result = self.process_parallel(InvokerCommand::Commit, ReceiverState::FinishedCommit, hook);
                if result.is_err() {
                    break;
                }
            }
            result
        })
    }

    /// Broadcast `command` and wait until every worker acknowledged
    fn process_parallel(
        &self,
        command: InvokerCommand,
        expected: ReceiverState,
        hook: Option<PhaseHook<S>>,
    ) -> SchedulerResult<()> {
        let (ack_tx, ack_rx) = bounded::<PhaseAck>(self.workers.len());
        for worker in &self.workers {
            let ack_tx = ack_tx.clone();
            let hook = hook.clone();
            let id = worker.id();
            worker.set_command_callback(move |fsm, state| {
                let state = match &hook {
                    Some(hook) if state == expected => {
                        match panic::catch_unwind(AssertUnwindSafe(|| hook(id, fsm))) {
                            Ok(()) => state,
                            Err(_) => {
                                tracing::error!(worker = id, ?command, "phase hook panicked");
                                ReceiverState::Failed
                            }
                        }
                    }
                    _ => state,
                };
                // coordinator may have given up on this phase
                let _ = ack_tx.send(PhaseAck { worker: id, state });
            });
        }
        drop(ack_tx);

        let mut first_error = None;
        let mut pending = 0;
        for worker in &self.workers {
            match worker.execute(command) {
                Ok(()) => pending += 1,
                Err(e) => {
                    tracing::error!(worker = worker.id(), ?command, error = %e, "failed to send command");
                    first_error.get_or_insert(e);
                }
            }
        }

        while pending > 0 {
            let ack = match ack_rx.recv() {
                Ok(ack) => ack,
                Err(_) => {
                    tracing::error!(?command, pending, "workers stopped answering");
                    return Err(first_error.unwrap_or(SchedulerError::WorkerDisconnected(0)));
                }
            };
            pending -= 1;
            if ack.state != expected {
                tracing::error!(worker = ack.worker, ?command, ?expected, actual = ?ack.state, "unexpected worker state");
                first_error.get_or_insert(SchedulerError::UnexpectedState {
                    worker: ack.worker,
                    command,
                    expected,
                    actual: ack.state,
                });
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Move transactions still held by workers back into their slots
    ///
    /// Only called after a phase barrier, when every worker is idle.
    fn reclaim(&self, slots: &Slots) {
        let n = self.workers.len();
        let mut slots = slots.lock();
        for worker in &self.workers {
            let id = worker.id();
            let txns = worker.state_machine().lock().take_txn_list();
            for (k, txn) in txns.into_iter().enumerate() {
                let pos = id + k * n;
                match slots.get_mut(pos) {
                    Some(slot) if slot.is_none() => *slot = Some(txn),
                    _ => tracing::error!(worker = id, pos, "no free slot for reclaimed transaction"),
                }
            }
        }
    }

    fn record_verdicts(&self, batch: &[Transaction]) {
        let (mut commit, mut abort, mut no_retry) = (0u64, 0u64, 0u64);
        for txn in batch {
            match txn.execution_result() {
                ExecutionResult::Commit => commit += 1,
                ExecutionResult::Abort => abort += 1,
                ExecutionResult::AbortNoRetry => no_retry += 1,
                ExecutionResult::Pending => {}
            }
        }
        self.metrics.incr("scheduler.txn.commit", commit);
        self.metrics.incr("scheduler.txn.abort", abort);
        self.metrics.incr("scheduler.txn.abort_no_retry", no_retry);
    }
}

impl<S: ReservationStrategy> Drop for Coordinator<S> {
    fn drop(&mut self) {
        for worker in &mut self.workers {
            worker.shutdown();
        }
        self.metrics.set_gauge("scheduler.workers", 0);
        tracing::info!(kind = S::WORKER_NAME, "coordinator stopped");
    }
}
