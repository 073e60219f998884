//! In-memory storage backend

use crate::batch::{BatchOp, WriteBatch};
use crate::error::StorageResult;
use crate::traits::DbConnection;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Hash map backed database
///
/// Batches are applied under a single write lock so readers never observe a
/// partially applied batch.
pub struct MemoryDb {
    name: String,
    data: RwLock<HashMap<Bytes, Bytes>>,
}

impl MemoryDb {
    /// Create an empty database
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if the database is empty
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Copy of all entries, for inspection
    pub fn entries(&self) -> Vec<(Bytes, Bytes)> {
        self.data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl DbConnection for MemoryDb {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn write(&self, batch: WriteBatch) -> StorageResult<()> {
        let mut data = self.data.write();
        for op in batch.into_operations() {
            match op {
                BatchOp::Put { key, value } => {
                    data.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }
}
