//! Ownership properties of the reservation tables under concurrency

mod common;

use common::*;
use neu_primitives::TxId;
use neu_scheduler::{AriaCoordinator, ReserveTable, WbCoordinator, WbReserveTable};
use neu_storage::BatchOp;
use neu_types::{ExecutionResult, Kv};
use proptest::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::thread;

/// (id, read keys, write keys) with ids unique within the batch
fn batch_strategy() -> impl Strategy<Value = Vec<(u64, Vec<u8>, Vec<u8>)>> {
    prop::collection::vec(
        (prop::collection::vec(0u8..6, 0..3), prop::collection::vec(0u8..6, 1..3)),
        1..24,
    )
    .prop_map(|sets| {
        sets.into_iter()
            .enumerate()
            .map(|(i, (reads, writes))| ((i as u64 * 7919) % 1009, reads, writes))
            .collect()
    })
}

fn kvs(keys: &[u8]) -> Vec<Kv> {
    keys.iter().map(|k| Kv::new(format!("k{}", k), "v")).collect()
}

/// Smallest id per key among the read sets or the write sets
fn min_owners(batch: &[(u64, Vec<u8>, Vec<u8>)], writes: bool) -> BTreeMap<u8, u64> {
    let mut owners = BTreeMap::new();
    for (id, reads, write_keys) in batch {
        let keys = if writes { write_keys } else { reads };
        for key in keys {
            let owner = owners.entry(*key).or_insert(*id);
            *owner = (*owner).min(*id);
        }
    }
    owners
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_reserve_table_min_wins(batch in batch_strategy()) {
        let table = ReserveTable::new();
        thread::scope(|s| {
            for chunk in batch.chunks(5) {
                let table = &table;
                s.spawn(move || {
                    for (id, reads, writes) in chunk {
                        table.reserve(&kvs(reads), &kvs(writes), TxId::from_u64(*id));
                    }
                });
            }
        });

        for (key, owner) in min_owners(&batch, true) {
            prop_assert_eq!(table.write_owner(format!("k{}", key).as_bytes()), Some(TxId::from_u64(owner)));
        }
        for (key, owner) in min_owners(&batch, false) {
            prop_assert_eq!(table.read_owner(format!("k{}", key).as_bytes()), Some(TxId::from_u64(owner)));
        }

        // at most one writer per key passes the waw check
        for (key, _) in min_owners(&batch, true) {
            let holders = batch
                .iter()
                .filter(|(_, _, writes)| writes.contains(&key))
                .filter(|(id, _, writes)| !table.analyze_dependency(&[], &kvs(writes), TxId::from_u64(*id)).waw)
                .count();
            prop_assert!(holders <= 1);
        }
    }

    #[test]
    fn prop_wb_tables_min_and_max(batch in batch_strategy()) {
        let table = WbReserveTable::new();
        thread::scope(|s| {
            for chunk in batch.chunks(4) {
                let table = &table;
                s.spawn(move || {
                    for (id, _, writes) in chunk {
                        table.reserve_writes(&kvs(writes), TxId::from_u64(*id));
                        table.mvcc_reserve_writes(&kvs(writes), TxId::from_u64(*id));
                    }
                });
            }
        });

        let mut max = BTreeMap::new();
        for (id, _, writes) in &batch {
            for key in writes {
                let owner = max.entry(*key).or_insert(*id);
                *owner = (*owner).max(*id);
            }
        }
        for (key, owner) in min_owners(&batch, true) {
            prop_assert_eq!(table.rs_owner(format!("k{}", key).as_bytes()), Some(TxId::from_u64(owner)));
        }
        for (key, owner) in max {
            prop_assert_eq!(table.cmt_owner(format!("k{}", key).as_bytes()), Some(TxId::from_u64(owner)));
        }
    }
}

// ==================== Coordinator level ====================

/// Transactions writing their own id into the chosen keys
fn scripted_batch(entries: &[(u64, Vec<u8>, Vec<u8>)]) -> Vec<neu_types::Transaction> {
    entries.iter()
        .map(|(id, reads, writes)| {
            let mut ops: Vec<String> = reads.iter().map(|k| format!("r:k{}", k)).collect();
            ops.extend(writes.iter().map(|k| format!("w:k{}={}", k, id)));
            let ops: Vec<&str> = ops.iter().map(String::as_str).collect();
            script(*id, &ops)
        })
        .collect()
}

fn fixed_batch() -> Vec<(u64, Vec<u8>, Vec<u8>)> {
    vec![
        (9, vec![], vec![0, 1]),
        (3, vec![2], vec![1]),
        (5, vec![0], vec![2, 3]),
        (1, vec![], vec![3]),
        (12, vec![4], vec![0, 4]),
        (7, vec![], vec![5]),
        (4, vec![5], vec![4]),
    ]
}

fn written_once(ops: &[BatchOp]) -> BTreeMap<Vec<u8>, u64> {
    let mut seen = HashSet::new();
    let mut values = BTreeMap::new();
    for op in ops {
        assert!(seen.insert(op.key().to_vec()), "key written twice: {:?}", op.key());
        if let BatchOp::Put { key, value } = op {
            let id = std::str::from_utf8(value).unwrap().parse().unwrap();
            values.insert(key.to_vec(), id);
        }
    }
    values
}

#[test]
fn test_aria_single_writer_is_min_reserver() {
    let db = Arc::new(RecordingDb::new());
    let mut coordinator = AriaCoordinator::with_registry(3, db.clone(), registry()).unwrap();
    let mut batch = scripted_batch(&fixed_batch());
    coordinator.process_batch(&mut batch).unwrap();

    let table = coordinator.strategy().table();
    let written = written_once(&db.ops());
    assert!(!written.is_empty());
    for (key, id) in &written {
        assert_eq!(table.write_owner(key), Some(TxId::from_u64(*id)));
        let writer = batch.iter().find(|t| t.id() == TxId::from_u64(*id)).unwrap();
        assert_eq!(writer.execution_result(), ExecutionResult::Commit);
    }
}

#[test]
fn test_write_based_single_writer_is_rs_owner() {
    let db = Arc::new(RecordingDb::new());
    let mut coordinator = WbCoordinator::with_registry(3, db.clone(), registry()).unwrap();
    let mut batch = scripted_batch(&fixed_batch());
    coordinator.process_batch(&mut batch).unwrap();

    let table = coordinator.strategy().table();
    let written = written_once(&db.ops());
    assert!(!written.is_empty());
    for (key, id) in &written {
        assert_eq!(table.rs_owner(key), Some(TxId::from_u64(*id)));
    }
    // aborted transactions write nothing
    for txn in &batch {
        if txn.execution_result() != ExecutionResult::Commit {
            assert!(written.values().all(|id| TxId::from_u64(*id) != txn.id()));
        }
    }
    assert_eq!(db.inner().len(), written.len());
}
