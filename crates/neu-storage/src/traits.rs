//! Storage traits consumed by the execution engine

use crate::batch::WriteBatch;
use crate::error::{StorageError, StorageResult};
use bytes::Bytes;

/// Connection to a key-value store
///
/// Shared by all workers of a coordinator: reads happen concurrently during
/// execution, each worker flushes its own write batch during commit.
pub trait DbConnection: Send + Sync {
    /// Database name
    fn name(&self) -> &str;

    /// Get a value; `None` if the key does not exist
    fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>>;

    /// Apply a batch atomically
    fn write(&self, batch: WriteBatch) -> StorageResult<()>;

    /// Build a batch with `fill` and apply it atomically
    ///
    /// If `fill` returns `false` nothing is written.
    fn sync_write_batch(&self, fill: &mut dyn FnMut(&mut WriteBatch) -> bool) -> StorageResult<()> {
        let mut batch = WriteBatch::new();
        if !fill(&mut batch) {
            return Err(StorageError::BatchAborted);
        }
        if batch.is_empty() {
            return Ok(());
        }
        self.write(batch)
    }

    /// Put a single key
    fn put(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let mut batch = WriteBatch::new();
        batch.put(Bytes::copy_from_slice(key), Bytes::copy_from_slice(value));
        self.write(batch)
    }

    /// Delete a single key; deleting a missing key is not an error
    fn delete(&self, key: &[u8]) -> StorageResult<()> {
        let mut batch = WriteBatch::new();
        batch.delete(Bytes::copy_from_slice(key));
        self.write(batch)
    }
}
