//! # neu-chaincode
//!
//! Chaincode runtime for NeuChain.
//!
//! This crate provides:
//! - `Orm`: records the read and write sets of one invocation
//! - The `Chaincode` trait and a name based `ChaincodeRegistry`
//! - Built-in chaincodes: `transfer`, `session_store` and `kv`

#![warn(missing_docs)]
#![warn(clippy::all)]

mod chaincode;
mod error;
mod kv_store;
mod orm;
mod session_store;
mod transfer;

pub use chaincode::{Chaincode, ChaincodeFactory, ChaincodeRegistry};
pub use error::{ChaincodeError, ChaincodeResult};
pub use kv_store::KvStore;
pub use orm::Orm;
pub use session_store::SimpleSessionStore;
pub use transfer::{SimpleTransfer, DEFAULT_AMOUNT};
