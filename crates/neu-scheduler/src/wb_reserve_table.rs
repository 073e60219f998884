//! Write-based reservation table
//!
//! Exec reserves write keys only (min-wins `rs` table). The first commit
//! round aborts readers of keys reserved by a smaller id and records the
//! survivors in a max-wins `cmt` table. The second commit round lets each
//! key be written only by its `rs` owner.

use crate::reserve_table::{owned_by_earlier, reserve_min};
use crate::strategy::stage_write;
use bytes::Bytes;
use dashmap::DashMap;
use neu_primitives::TxId;
use neu_storage::WriteBatch;
use neu_types::Kv;

/// Min-wins `rs` table and max-wins `cmt` table for one batch
#[derive(Debug, Default)]
pub struct WbReserveTable {
    rs_table: DashMap<Bytes, TxId>,
    cmt_table: DashMap<Bytes, TxId>,
}

impl WbReserveTable {
    /// Create empty tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every reservation
    pub fn reset(&self) {
        self.rs_table.clear();
        self.cmt_table.clear();
    }

    /// Reserve the write keys of transaction `id` (min-wins)
    pub fn reserve_writes(&self, writes: &[Kv], id: TxId) {
        for kv in writes {
            reserve_min(&self.rs_table, &kv.key, id);
        }
    }

    /// Whether a smaller id reserved one of the keys `id` read
    pub fn detect_raw(&self, reads: &[Kv], id: TxId) -> bool {
        owned_by_earlier(&self.rs_table, reads, id)
    }

    /// Record `id` as a surviving writer (max-wins)
    ///
    /// An existing entry is kept if it is `>=` `id`.
    pub fn mvcc_reserve_writes(&self, writes: &[Kv], id: TxId) {
        for kv in writes {
            self.cmt_table
                .entry(kv.key.clone())
                .and_modify(|owner| {
                    if *owner < id {
                        *owner = id;
                    }
                })
                .or_insert(id);
        }
    }

    /// Stage the writes of `id` for the keys it owns in the `rs` table
    ///
    /// Returns the number of staged operations.
    pub fn update_db(&self, writes: &[Kv], id: TxId, batch: &mut WriteBatch) -> usize {
        let mut staged = 0;
        for kv in writes {
            if self.rs_owner(&kv.key) == Some(id) {
                stage_write(kv, batch);
                staged += 1;
            }
        }
        staged
    }

    /// Smallest id that reserved `key` during exec
    pub fn rs_owner(&self, key: &[u8]) -> Option<TxId> {
        self.rs_table.get(key).map(|owner| *owner)
    }

    /// Largest surviving writer of `key` after the first commit round
    pub fn cmt_owner(&self, key: &[u8]) -> Option<TxId> {
        self.cmt_table.get(key).map(|owner| *owner)
    }
}
