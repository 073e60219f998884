//! Common error types for primitives

use crate::tx_id::TxIdError;
use thiserror::Error;

/// Primitive operation error
#[derive(Debug, Error)]
pub enum PrimitiveError {
    /// Transaction id error
    #[error("tx id error: {0}")]
    TxId(#[from] TxIdError),
}
