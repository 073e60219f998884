//! # neu-types
//!
//! Core data types for NeuChain.
//!
//! - `Kv` / `KvList`: read and write sets produced by chaincode execution
//! - `UserRequest` / `Envelope`: client requests and their signed wrapper
//! - `Transaction`: a request inside a batch together with its execution result

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod kv;
mod request;
mod transaction;

pub use error::{TypesError, TypesResult};
pub use kv::{Kv, KvList};
pub use request::{Envelope, SignatureString, UserRequest};
pub use transaction::{ExecutionResult, Transaction, TxReadWriteSet};
