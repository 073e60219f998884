//! Error types for core data types

use thiserror::Error;

/// Type conversion errors
#[derive(Debug, Error)]
pub enum TypesError {
    /// Request payload could not be encoded or decoded
    #[error("user request codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Result type for type conversions
pub type TypesResult<T> = Result<T, TypesError>;
