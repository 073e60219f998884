//! Chaincode error types

use neu_storage::StorageError;
use thiserror::Error;

/// Chaincode errors
///
/// Any error aborts the invoking transaction without retry.
#[derive(Debug, Error)]
pub enum ChaincodeError {
    /// No chaincode registered under this name
    #[error("unknown chaincode: {0}")]
    UnknownChaincode(String),

    /// Function not provided by the chaincode
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number or format of arguments
    #[error("invalid arguments for {func}: {reason}")]
    InvalidArgs {
        /// Function name
        func: String,
        /// What is wrong
        reason: String,
    },

    /// A key the chaincode needs does not exist
    #[error("missing key: {0}")]
    MissingKey(String),

    /// A stored value cannot be interpreted
    #[error("invalid value at {key}: {reason}")]
    InvalidValue {
        /// Key holding the value
        key: String,
        /// What is wrong
        reason: String,
    },

    /// Storage error while reading
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ChaincodeError {
    pub(crate) fn invalid_args(func: &str, reason: impl Into<String>) -> Self {
        ChaincodeError::InvalidArgs {
            func: func.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for chaincode operations
pub type ChaincodeResult<T> = Result<T, ChaincodeError>;
