//! RocksDB backend

use crate::batch::{BatchOp, WriteBatch};
use crate::error::{StorageError, StorageResult};
use crate::traits::DbConnection;
use bytes::Bytes;
use parking_lot::RwLock;
use rocksdb::{DBWithThreadMode, MultiThreaded, Options, WriteOptions};
use std::path::Path;

type RocksDB = DBWithThreadMode<MultiThreaded>;

/// Database configuration
#[derive(Clone, Debug)]
pub struct DbConfig {
    /// Create database if missing
    pub create_if_missing: bool,
    /// Maximum number of open files
    pub max_open_files: i32,
    /// Write buffer size
    pub write_buffer_size: usize,
    /// Maximum write buffers
    pub max_write_buffer_number: i32,
    /// fsync every batch
    pub sync_writes: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            max_open_files: 512,
            write_buffer_size: 64 * 1024 * 1024, // 64MB
            max_write_buffer_number: 3,
            sync_writes: false,
        }
    }
}

/// RocksDB connection
pub struct RocksDb {
    db: RwLock<Option<RocksDB>>,
    path: String,
    sync_writes: bool,
}

impl RocksDb {
    /// Create a new database instance (not yet opened)
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            db: RwLock::new(None),
            path: path.as_ref().to_string_lossy().to_string(),
            sync_writes: false,
        }
    }

    /// Open the database with default config
    pub fn open(&mut self) -> StorageResult<()> {
        self.open_with_config(DbConfig::default())
    }

    /// Open the database with custom config
    pub fn open_with_config(&mut self, config: DbConfig) -> StorageResult<()> {
        let mut db_guard = self.db.write();
        if db_guard.is_some() {
            return Err(StorageError::AlreadyOpen);
        }

        let mut opts = Options::default();
        opts.create_if_missing(config.create_if_missing);
        opts.set_max_open_files(config.max_open_files);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);

        let db = RocksDB::open(&opts, &self.path)?;
        *db_guard = Some(db);
        drop(db_guard);
        self.sync_writes = config.sync_writes;
        tracing::info!(path = %self.path, "rocksdb opened");
        Ok(())
    }

    /// Close the database
    pub fn close(&self) {
        let mut db_guard = self.db.write();
        *db_guard = None;
    }

    /// Check if database is open
    pub fn is_open(&self) -> bool {
        self.db.read().is_some()
    }

    /// Get database path
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl DbConnection for RocksDb {
    fn name(&self) -> &str {
        &self.path
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>> {
        let db_guard = self.db.read();
        let db = db_guard.as_ref().ok_or(StorageError::NotOpen)?;
        Ok(db.get(key)?.map(Bytes::from))
    }

    fn write(&self, batch: WriteBatch) -> StorageResult<()> {
        let db_guard = self.db.read();
        let db = db_guard.as_ref().ok_or(StorageError::NotOpen)?;

        let mut rocks_batch = rocksdb::WriteBatch::default();
        for op in batch.into_operations() {
            match op {
                BatchOp::Put { key, value } => rocks_batch.put(&key, &value),
                BatchOp::Delete { key } => rocks_batch.delete(&key),
            }
        }

        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.sync_writes);
        db.write_opt(rocks_batch, &write_opts)?;
        Ok(())
    }
}
