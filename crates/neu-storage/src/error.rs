//! Storage error types

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// RocksDB error
    #[cfg(feature = "rocksdb")]
    #[error("rocksdb error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// The write batch callback refused to commit
    #[error("write batch aborted by caller")]
    BatchAborted,

    /// Database not open
    #[error("database not open")]
    NotOpen,

    /// Database already open
    #[error("database already open")]
    AlreadyOpen,

    /// Backend rejected the write
    #[error("write rejected: {0}")]
    WriteRejected(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
