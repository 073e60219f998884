//! Shared helpers for the scheduler integration tests

#![allow(dead_code)]

use bytes::Bytes;
use neu_chaincode::{Chaincode, ChaincodeError, ChaincodeRegistry, ChaincodeResult, Orm};
use neu_primitives::TxId;
use neu_storage::{BatchOp, DbConnection, MemoryDb, StorageError, StorageResult, WriteBatch};
use neu_types::{ExecutionResult, Transaction, UserRequest};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Chaincode whose reads and writes are spelled out in its arguments
///
/// - `r:key` reads `key`
/// - `w:key=value` writes `key`
/// - `d:key` deletes `key`
/// - `sleep:micros` sleeps
/// - `fail` returns an error
/// - `panic` panics
pub struct ScriptChaincode;

impl Chaincode for ScriptChaincode {
    fn invoke(&mut self, orm: &mut Orm<'_>, _func: &str, args: &[String]) -> ChaincodeResult<()> {
        for arg in args {
            if let Some(key) = arg.strip_prefix("r:") {
                orm.get(key.to_string())?;
            } else if let Some(kv) = arg.strip_prefix("w:") {
                let (key, value) = kv.split_once('=').unwrap_or((kv, "x"));
                orm.put(key.to_string(), value.to_string());
            } else if let Some(key) = arg.strip_prefix("d:") {
                orm.del(key.to_string());
            } else if let Some(micros) = arg.strip_prefix("sleep:") {
                let micros = micros.parse().unwrap_or(0);
                thread::sleep(Duration::from_micros(micros));
            } else if arg == "fail" {
                return Err(ChaincodeError::UnknownFunction("fail".into()));
            } else if arg == "panic" {
                panic!("script asked to panic");
            }
        }
        Ok(())
    }
}

/// Built-in chaincodes plus `script`
pub fn registry() -> Arc<ChaincodeRegistry> {
    let mut registry = ChaincodeRegistry::with_builtins();
    registry.register("script", || Box::new(ScriptChaincode));
    Arc::new(registry)
}

/// Transaction `id` running `script` with `ops`
pub fn script(id: u64, ops: &[&str]) -> Transaction {
    Transaction::new(
        TxId::from_u64(id),
        UserRequest::new("script", "run", ops.iter().copied()),
    )
    .unwrap()
}

/// Transaction `id` moving the default amount from `from` to `to`
pub fn transfer(id: u64, from: u64, to: u64) -> Transaction {
    Transaction::new(
        TxId::from_u64(id),
        UserRequest::new("transfer", "transfer", [from.to_string(), to.to_string()]),
    )
    .unwrap()
}

/// Transaction `id` moving `amount` from `from` to `to`
pub fn transfer_amount(id: u64, from: u64, to: u64, amount: i64) -> Transaction {
    Transaction::new(
        TxId::from_u64(id),
        UserRequest::new(
            "transfer",
            "transfer",
            [from.to_string(), to.to_string(), amount.to_string()],
        ),
    )
    .unwrap()
}

/// Seed `accounts` balances of `initial`
pub fn seed_accounts(db: &MemoryDb, accounts: u64, initial: i64) {
    let mut batch = WriteBatch::new();
    for i in 0..accounts {
        batch.put(i.to_string(), initial.to_string());
    }
    db.write(batch).unwrap();
}

/// Sum of all balances
pub fn total_balance(db: &MemoryDb) -> i64 {
    db.entries()
        .iter()
        .map(|(_, v)| std::str::from_utf8(v).unwrap().parse::<i64>().unwrap())
        .sum()
}

pub fn verdicts(batch: &[Transaction]) -> Vec<ExecutionResult> {
    batch.iter().map(|t| t.execution_result()).collect()
}

/// Memory database remembering every flushed operation
pub struct RecordingDb {
    inner: MemoryDb,
    ops: Mutex<Vec<BatchOp>>,
}

impl RecordingDb {
    pub fn new() -> Self {
        Self {
            inner: MemoryDb::new("recording"),
            ops: Mutex::new(Vec::new()),
        }
    }

    pub fn ops(&self) -> Vec<BatchOp> {
        self.ops.lock().clone()
    }

    pub fn inner(&self) -> &MemoryDb {
        &self.inner
    }
}

impl DbConnection for RecordingDb {
    fn name(&self) -> &str {
        "recording"
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>> {
        self.inner.get(key)
    }

    fn write(&self, batch: WriteBatch) -> StorageResult<()> {
        self.ops.lock().extend(batch.operations().iter().cloned());
        self.inner.write(batch)
    }
}

/// Memory database that refuses every write
pub struct ReadOnlyDb {
    inner: MemoryDb,
}

impl ReadOnlyDb {
    pub fn new(inner: MemoryDb) -> Self {
        Self { inner }
    }
}

impl DbConnection for ReadOnlyDb {
    fn name(&self) -> &str {
        "read_only"
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Bytes>> {
        self.inner.get(key)
    }

    fn write(&self, _batch: WriteBatch) -> StorageResult<()> {
        Err(StorageError::WriteRejected("read only".into()))
    }
}
