//! Read/write-set recorder handed to chaincodes

use crate::error::ChaincodeResult;
use bytes::Bytes;
use neu_storage::DbConnection;
use neu_types::{Kv, KvList};

/// Object-relational mapper for a single chaincode invocation
///
/// Reads go through to storage and are recorded; writes are only recorded.
/// Nothing touches storage until the engine commits the transaction.
pub struct Orm<'a> {
    db: &'a dyn DbConnection,
    reads: KvList,
    writes: KvList,
    result: Bytes,
}

impl<'a> Orm<'a> {
    /// Create a recorder reading from `db`
    pub fn new(db: &'a dyn DbConnection) -> Self {
        Self {
            db,
            reads: Vec::new(),
            writes: Vec::new(),
            result: Bytes::new(),
        }
    }

    /// Read a key
    ///
    /// The key lands in the read set even when it is missing, so a later
    /// writer of the key in the same batch is seen as a conflict. Returns
    /// `None` for a missing key or an empty (deleted) value.
    pub fn get(&mut self, key: impl Into<Bytes>) -> ChaincodeResult<Option<Bytes>> {
        let key = key.into();
        let value = self.db.get(&key)?.unwrap_or_default();
        match self.reads.iter_mut().find(|kv| kv.key == key) {
            Some(kv) => kv.value = value.clone(),
            None => self.reads.push(Kv::new(key, value.clone())),
        }
        if value.is_empty() {
            return Ok(None);
        }
        Ok(Some(value))
    }

    /// Write a key; a second write to the same key replaces the first
    pub fn put(&mut self, key: impl Into<Bytes>, value: impl Into<Bytes>) {
        self.record_write(Kv::new(key, value));
    }

    /// Delete a key
    pub fn del(&mut self, key: impl Into<Bytes>) {
        self.record_write(Kv::tombstone(key));
    }

    /// Set the value returned to the client
    pub fn set_result(&mut self, result: impl Into<Bytes>) {
        self.result = result.into();
    }

    /// Keys read so far
    pub fn reads(&self) -> &KvList {
        &self.reads
    }

    /// Keys written so far
    pub fn writes(&self) -> &KvList {
        &self.writes
    }

    /// Consume the recorder, returning `(reads, writes, result)`
    pub fn into_rw_sets(self) -> (KvList, KvList, Bytes) {
        (self.reads, self.writes, self.result)
    }

    fn record_write(&mut self, kv: Kv) {
        match self.writes.iter_mut().find(|w| w.key == kv.key) {
            Some(existing) => *existing = kv,
            None => self.writes.push(kv),
        }
    }
}
