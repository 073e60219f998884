//! # neu-primitives
//!
//! Primitive types for NeuChain.
//!
//! This crate provides the fundamental data types shared by the execution
//! engine, most importantly the transaction identifier whose byte-wise order
//! defines the serial order of a batch.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod tx_id;

pub use error::PrimitiveError;
pub use tx_id::{compare_tid, TxId, TxIdError};

/// Index of a worker inside a coordinator's pool
pub type WorkerId = usize;
