//! Error types for the scheduler

use crate::worker::{InvokerCommand, ReceiverState};
use neu_primitives::WorkerId;
use thiserror::Error;

/// Scheduler errors
///
/// These are batch-level faults. Per-transaction failures are reported
/// through each transaction's `ExecutionResult` instead.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A coordinator needs at least one worker
    #[error("invalid worker count: {0}")]
    InvalidWorkerCount(usize),

    /// Worker thread already running
    #[error("worker {0} already started")]
    AlreadyStarted(WorkerId),

    /// Worker thread not running
    #[error("worker {0} not started")]
    NotStarted(WorkerId),

    /// The OS refused to spawn a worker thread
    #[error("failed to spawn worker {worker}: {source}")]
    WorkerSpawn {
        /// Worker id
        worker: WorkerId,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Worker thread is gone
    #[error("worker {0} disconnected")]
    WorkerDisconnected(WorkerId),

    /// A worker finished a phase in the wrong state
    #[error("worker {worker} answered {command:?} with {actual:?}, expected {expected:?}")]
    UnexpectedState {
        /// Worker id
        worker: WorkerId,
        /// Command of the phase
        command: InvokerCommand,
        /// State the coordinator waited for
        expected: ReceiverState,
        /// State the worker reported
        actual: ReceiverState,
    },
}

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;
