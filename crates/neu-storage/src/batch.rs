//! Write batches

use bytes::Bytes;

/// Batch operation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchOp {
    /// Insert or overwrite a key
    Put {
        /// Key
        key: Bytes,
        /// Value
        value: Bytes,
    },
    /// Remove a key
    Delete {
        /// Key
        key: Bytes,
    },
}

impl BatchOp {
    /// Key touched by this operation
    pub fn key(&self) -> &Bytes {
        match self {
            BatchOp::Put { key, .. } | BatchOp::Delete { key } => key,
        }
    }
}

/// Ordered set of writes applied atomically by a `DbConnection`
#[derive(Clone, Debug, Default)]
pub struct WriteBatch {
    operations: Vec<BatchOp>,
}

impl WriteBatch {
    /// Create a new write batch
    pub fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    /// Add a put operation
    pub fn put(&mut self, key: impl Into<Bytes>, value: impl Into<Bytes>) {
        self.operations.push(BatchOp::Put {
            key: key.into(),
            value: value.into(),
        });
    }

    /// Add a delete operation
    pub fn delete(&mut self, key: impl Into<Bytes>) {
        self.operations.push(BatchOp::Delete { key: key.into() });
    }

    /// Operations in insertion order
    pub fn operations(&self) -> &[BatchOp] {
        &self.operations
    }

    /// Consume the batch
    pub fn into_operations(self) -> Vec<BatchOp> {
        self.operations
    }

    /// Get number of operations
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Check if batch is empty
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
