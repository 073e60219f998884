//! # neu-storage
//!
//! Storage layer for NeuChain.
//!
//! This crate provides:
//! - The `DbConnection` abstraction consumed by the execution engine
//! - Atomic write batches
//! - An in-memory backend
//! - A RocksDB backend (feature `rocksdb`)

#![warn(missing_docs)]
#![warn(clippy::all)]

mod batch;
#[cfg(feature = "rocksdb")]
mod db;
mod error;
mod memory;
mod traits;

pub use batch::{BatchOp, WriteBatch};
#[cfg(feature = "rocksdb")]
pub use db::{DbConfig, RocksDb};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryDb;
pub use traits::DbConnection;
