//! Single-round reservation table
//!
//! During exec every transaction records its read and write keys. Each key
//! keeps the smallest transaction id that touched it. During commit a
//! transaction compares its own id against those owners to find the
//! dependencies it has on higher-priority (smaller id) transactions.

use bytes::Bytes;
use dashmap::DashMap;
use neu_primitives::TxId;
use neu_types::{ExecutionResult, Kv};

/// Record `id` for `key` if no smaller id is recorded yet
pub(crate) fn reserve_min(table: &DashMap<Bytes, TxId>, key: &Bytes, id: TxId) {
    table
        .entry(key.clone())
        .and_modify(|owner| {
            if id < *owner {
                *owner = id;
            }
        })
        .or_insert(id);
}

/// Whether any of `kvs` is owned by an id smaller than `id`
pub(crate) fn owned_by_earlier(table: &DashMap<Bytes, TxId>, kvs: &[Kv], id: TxId) -> bool {
    kvs.iter().any(|kv| {
        table
            .get(&kv.key)
            .map(|owner| *owner < id)
            .unwrap_or(false)
    })
}

/// Dependencies of a transaction on smaller ids in the same batch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Dependency {
    /// A smaller id also wrote one of our write keys
    pub waw: bool,
    /// A smaller id read one of our write keys
    pub war: bool,
    /// A smaller id wrote one of our read keys
    pub raw: bool,
}

impl Dependency {
    /// Commit policy
    ///
    /// Abort on `waw`, or on `war` and `raw` together; anything else commits.
    pub fn verdict(&self) -> ExecutionResult {
        if self.waw || (self.war && self.raw) {
            ExecutionResult::Abort
        } else {
            ExecutionResult::Commit
        }
    }
}

/// Min-wins read and write tables for one batch
#[derive(Debug, Default)]
pub struct ReserveTable {
    write_table: DashMap<Bytes, TxId>,
    read_table: DashMap<Bytes, TxId>,
}

impl ReserveTable {
    /// Create empty tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every reservation
    pub fn reset(&self) {
        self.write_table.clear();
        self.read_table.clear();
    }

    /// Reserve the read and write keys of transaction `id`
    ///
    /// Safe to call from many threads at once; the final owner of each key
    /// does not depend on call order.
    pub fn reserve(&self, reads: &[Kv], writes: &[Kv], id: TxId) {
        for kv in writes {
            reserve_min(&self.write_table, &kv.key, id);
        }
        for kv in reads {
            reserve_min(&self.read_table, &kv.key, id);
        }
    }

    /// Compute the dependencies of transaction `id` from the recorded owners
    pub fn analyze_dependency(&self, reads: &[Kv], writes: &[Kv], id: TxId) -> Dependency {
        Dependency {
            waw: owned_by_earlier(&self.write_table, writes, id),
            war: owned_by_earlier(&self.read_table, writes, id),
            raw: owned_by_earlier(&self.write_table, reads, id),
        }
    }

    /// Smallest id that wrote `key`
    pub fn write_owner(&self, key: &[u8]) -> Option<TxId> {
        self.write_table.get(key).map(|owner| *owner)
    }

    /// Smallest id that read `key`
    pub fn read_owner(&self, key: &[u8]) -> Option<TxId> {
        self.read_table.get(key).map(|owner| *owner)
    }

    /// Number of reserved write keys
    pub fn write_len(&self) -> usize {
        self.write_table.len()
    }

    /// Number of reserved read keys
    pub fn read_len(&self) -> usize {
        self.read_table.len()
    }
}
