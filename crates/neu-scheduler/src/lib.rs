//! # neu-scheduler
//!
//! Deterministic parallel transaction execution for NeuChain.
//!
//! A batch is split round-robin across a fixed pool of worker threads and
//! driven through barrier-synchronized phases (start, exec, commit). During
//! exec every transaction runs against the same snapshot without locks and
//! reserves its keys in a shared reservation table; during commit each
//! transaction checks the table against its own id and either commits or
//! aborts. The smallest id touching a key always wins, so the outcome does
//! not depend on thread timing.
//!
//! Features:
//! - Single-round min-wins reservation (`AriaCoordinator`)
//! - Two-round write-based reservation (`WbCoordinator`)
//! - Worker threads driven by typed commands over channels
//! - Custom commands for pool-wide maintenance (new db, new tables)

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod coordinator;
mod error;
mod fsm;
mod reserve_table;
mod strategy;
mod wb_reserve_table;
mod worker;

pub use config::{EngineVariant, SchedulerConfig};
pub use coordinator::{AriaCoordinator, Coordinator, ProcessedRequest, WbCoordinator};
pub use error::{SchedulerError, SchedulerResult};
pub use fsm::AriaWorkerFsm;
pub use reserve_table::{Dependency, ReserveTable};
pub use strategy::{MinMaxWinsTwoRound, MinWinsSingleRound, ReservationStrategy};
pub use wb_reserve_table::WbReserveTable;
pub use worker::{InvokerCommand, ReceiverState, Worker, WorkerStateMachine};
