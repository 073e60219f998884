//! End-to-end batch scenarios

mod common;

use common::*;
use neu_primitives::TxId;
use neu_scheduler::{
    AriaCoordinator, InvokerCommand, ReceiverState, SchedulerError, WbCoordinator,
};
use neu_storage::{DbConnection, MemoryDb};
use neu_types::{Envelope, ExecutionResult, UserRequest};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;

fn tid(n: u64) -> TxId {
    TxId::from_u64(n)
}

// ==================== Single round ====================

#[test]
fn test_three_transaction_scenario() {
    let db = Arc::new(MemoryDb::new("scenario"));
    let mut coordinator = AriaCoordinator::with_registry(2, db.clone(), registry()).unwrap();

    let mut batch = vec![
        script(1, &["w:a=1"]),
        script(2, &["r:b", "w:a=2"]),
        script(3, &["w:b=3"]),
    ];
    coordinator.process_batch(&mut batch).unwrap();

    assert_eq!(
        verdicts(&batch),
        vec![
            ExecutionResult::Commit,
            ExecutionResult::Abort,
            ExecutionResult::Commit,
        ]
    );

    // T3 sees T2's read of b in the table even though T2 aborted
    let table = coordinator.strategy().table();
    assert_eq!(table.write_owner(b"a"), Some(tid(1)));
    assert_eq!(table.write_owner(b"b"), Some(tid(3)));
    assert_eq!(table.read_owner(b"b"), Some(tid(2)));
    let dep = table.analyze_dependency(batch[2].reads(), batch[2].writes(), tid(3));
    assert!(dep.war);
    assert!(!dep.waw && !dep.raw);

    assert_eq!(db.get(b"a").unwrap().as_deref(), Some(b"1".as_ref()));
    assert_eq!(db.get(b"b").unwrap().as_deref(), Some(b"3".as_ref()));
}

#[test]
fn test_war_and_raw_aborts() {
    let db = Arc::new(MemoryDb::new("scenario"));
    let mut coordinator = AriaCoordinator::with_registry(3, db.clone(), registry()).unwrap();

    // T2 reads x written by T1 and writes y read by T1
    let mut batch = vec![
        script(1, &["r:y", "w:x=1"]),
        script(2, &["r:x", "w:y=2"]),
        script(3, &["r:x", "w:z=3"]),
    ];
    coordinator.process_batch(&mut batch).unwrap();
    assert_eq!(
        verdicts(&batch),
        vec![
            ExecutionResult::Commit,
            ExecutionResult::Abort,
            // raw only
            ExecutionResult::Commit,
        ]
    );
    assert_eq!(db.get(b"y").unwrap(), None);
    assert_eq!(db.get(b"z").unwrap().as_deref(), Some(b"3".as_ref()));
}

#[test]
fn test_delete_and_read_only() {
    let db = Arc::new(MemoryDb::new("scenario"));
    db.put(b"gone", b"v").unwrap();
    db.put(b"kept", b"v").unwrap();
    let mut coordinator = AriaCoordinator::with_registry(2, db.clone(), registry()).unwrap();

    let mut batch = vec![script(5, &["r:gone", "r:kept"]), script(6, &["d:gone"])];
    coordinator.process_batch(&mut batch).unwrap();

    assert_eq!(verdicts(&batch), vec![ExecutionResult::Commit; 2]);
    // the read-only transaction reserved nothing
    assert_eq!(coordinator.strategy().table().read_owner(b"kept"), None);
    assert_eq!(db.get(b"gone").unwrap(), None);
    assert_eq!(db.len(), 1);
}

#[test]
fn test_chaincode_failure_is_abort_no_retry() {
    let db = Arc::new(MemoryDb::new("scenario"));
    let mut coordinator = AriaCoordinator::with_registry(2, db.clone(), registry()).unwrap();

    let mut batch = vec![
        script(1, &["w:a=1", "fail"]),
        script(2, &["w:a=2"]),
        transfer(3, 40, 41),
    ];
    coordinator.process_batch(&mut batch).unwrap();
    assert_eq!(
        verdicts(&batch),
        vec![
            ExecutionResult::AbortNoRetry,
            ExecutionResult::Commit,
            ExecutionResult::AbortNoRetry,
        ]
    );
    // the failed writer never reserved a
    assert_eq!(coordinator.strategy().table().write_owner(b"a"), Some(tid(2)));
    assert_eq!(db.get(b"a").unwrap().as_deref(), Some(b"2".as_ref()));

    // terminal across batches
    coordinator.process_batch(&mut batch).unwrap();
    assert_eq!(batch[0].execution_result(), ExecutionResult::AbortNoRetry);
}

#[test]
fn test_aborted_transaction_retries_in_next_batch() {
    let db = Arc::new(MemoryDb::new("scenario"));
    let mut coordinator = AriaCoordinator::with_registry(2, db.clone(), registry()).unwrap();

    let mut batch = vec![script(1, &["w:a=1"]), script(2, &["w:a=2"])];
    coordinator.process_batch(&mut batch).unwrap();
    assert_eq!(batch[1].execution_result(), ExecutionResult::Abort);

    let mut retry = vec![batch.remove(1)];
    coordinator.process_batch(&mut retry).unwrap();
    assert_eq!(retry[0].execution_result(), ExecutionResult::Commit);
    assert_eq!(db.get(b"a").unwrap().as_deref(), Some(b"2".as_ref()));
}

#[test]
fn test_balance_overflow_aborts_only_that_transfer() {
    let db = Arc::new(MemoryDb::new("scenario"));
    seed_accounts(&db, 8, 0);
    let mut coordinator = AriaCoordinator::new(2, db.clone()).unwrap();

    let mut batch = vec![
        transfer_amount(1, 0, 1, i64::MIN),
        transfer_amount(2, 5, 6, 10),
        transfer_amount(3, 2, 3, i64::MAX),
    ];
    coordinator.process_batch(&mut batch).unwrap();
    assert_eq!(
        verdicts(&batch),
        vec![
            ExecutionResult::AbortNoRetry,
            ExecutionResult::Commit,
            ExecutionResult::Commit,
        ]
    );

    // a second i64::MAX out of account 2 no longer fits
    let mut batch = vec![transfer_amount(4, 2, 3, i64::MAX), transfer_amount(5, 6, 7, 1)];
    coordinator.process_batch(&mut batch).unwrap();
    assert_eq!(
        verdicts(&batch),
        vec![ExecutionResult::AbortNoRetry, ExecutionResult::Commit]
    );
    let balance = |key: &[u8]| {
        let value = db.get(key).unwrap().unwrap();
        std::str::from_utf8(&value).unwrap().parse::<i64>().unwrap()
    };
    assert_eq!(balance(b"0"), 0);
    assert_eq!(balance(b"1"), 0);
    assert_eq!(balance(b"2"), -i64::MAX);
    assert_eq!(balance(b"3"), i64::MAX);
    assert_eq!(balance(b"6"), 9);
    assert_eq!(balance(b"7"), 1);
}

#[test]
fn test_chaincode_panic_is_abort_no_retry() {
    let db = Arc::new(MemoryDb::new("scenario"));
    let mut coordinator = WbCoordinator::with_registry(2, db.clone(), registry()).unwrap();

    let mut batch = vec![
        script(1, &["w:a=1"]),
        script(2, &["w:b=2", "panic"]),
        script(3, &["w:c=3"]),
        script(4, &["panic"]),
    ];
    coordinator.process_batch(&mut batch).unwrap();
    assert_eq!(
        verdicts(&batch),
        vec![
            ExecutionResult::Commit,
            ExecutionResult::AbortNoRetry,
            ExecutionResult::Commit,
            ExecutionResult::AbortNoRetry,
        ]
    );
    assert_eq!(db.get(b"b").unwrap(), None);
    assert_eq!(db.len(), 2);
    assert_eq!(coordinator.metrics().counter("scheduler.batch_failures"), None);
}

// ==================== Write based ====================

#[test]
fn test_write_based_scenario() {
    let db = Arc::new(MemoryDb::new("scenario"));
    let mut coordinator = WbCoordinator::with_registry(2, db.clone(), registry()).unwrap();

    let mut batch = vec![
        script(1, &["w:a=1"]),
        script(2, &["r:b", "w:a=2"]),
        script(3, &["w:b=3"]),
    ];
    coordinator.process_batch(&mut batch).unwrap();

    // T2 read b which T3 reserved, but T3 is larger: no raw
    assert_eq!(verdicts(&batch), vec![ExecutionResult::Commit; 3]);
    let table = coordinator.strategy().table();
    assert_eq!(table.rs_owner(b"a"), Some(tid(1)));
    assert_eq!(table.cmt_owner(b"a"), Some(tid(2)));
    // only the rs owner wrote a
    assert_eq!(db.get(b"a").unwrap().as_deref(), Some(b"1".as_ref()));
    assert_eq!(db.get(b"b").unwrap().as_deref(), Some(b"3".as_ref()));
}

#[test]
fn test_write_based_raw_abort() {
    let db = Arc::new(MemoryDb::new("scenario"));
    let mut coordinator = WbCoordinator::with_registry(3, db.clone(), registry()).unwrap();

    let mut batch = vec![script(1, &["w:a=1"]), script(2, &["r:a", "w:c=2"])];
    coordinator.process_batch(&mut batch).unwrap();
    assert_eq!(
        verdicts(&batch),
        vec![ExecutionResult::Commit, ExecutionResult::Abort]
    );
    assert_eq!(db.get(b"c").unwrap(), None);
    assert_eq!(coordinator.strategy().table().cmt_owner(b"c"), None);
}

// ==================== Infrastructure ====================

#[test]
fn test_flush_failure_fails_batch() {
    let db = Arc::new(ReadOnlyDb::new(MemoryDb::new("base")));
    let mut coordinator = AriaCoordinator::with_registry(2, db, registry()).unwrap();

    let mut batch: Vec<_> = (0..6)
        .map(|i| {
            let op = format!("w:k{}=v", i);
            script(i, &[op.as_str()])
        })
        .collect();
    let err = coordinator.process_batch(&mut batch).unwrap_err();
    assert!(matches!(
        err,
        SchedulerError::UnexpectedState {
            command: InvokerCommand::Commit,
            expected: ReceiverState::FinishedCommit,
            actual: ReceiverState::Failed,
            ..
        }
    ));

    // every transaction is handed back, in order
    let ids: Vec<_> = batch.iter().map(|t| t.id()).collect();
    assert_eq!(ids, (0..6).map(tid).collect::<Vec<_>>());
    assert_eq!(coordinator.metrics().counter("scheduler.batch_failures"), Some(1));

    // the pool is still usable
    coordinator
        .set_db(Arc::new(MemoryDb::new("fresh")))
        .unwrap();
    coordinator.process_batch(&mut batch).unwrap();
    assert!(batch.iter().all(|t| t.execution_result() == ExecutionResult::Commit));
}

#[test]
fn test_shared_coordinator_runs_one_batch_at_a_time() {
    let db = Arc::new(MemoryDb::new("scenario"));
    let coordinator = Arc::new(Mutex::new(
        AriaCoordinator::with_registry(2, db.clone(), registry()).unwrap(),
    ));

    let handles: Vec<_> = (0..2u64)
        .map(|t| {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || {
                for round in 0..3u64 {
                    let first = t * 1_000 + round * 100;
                    let mut batch: Vec<_> = (0..16)
                        .map(|i| {
                            let op = format!("w:t{}r{}k{}=v", t, round, i);
                            script(first + i, &[op.as_str()])
                        })
                        .collect();
                    coordinator.lock().process_batch(&mut batch).unwrap();
                    assert_eq!(batch.len(), 16);
                    assert!(batch.iter().all(|t| t.execution_result() == ExecutionResult::Commit));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(db.len(), 2 * 3 * 16);
    assert_eq!(coordinator.lock().metrics().counter("scheduler.batches"), Some(6));
}

#[test]
fn test_set_db() {
    let first = Arc::new(MemoryDb::new("first"));
    let second = Arc::new(MemoryDb::new("second"));
    let mut coordinator = AriaCoordinator::with_registry(3, first.clone(), registry()).unwrap();

    coordinator.set_db(second.clone()).unwrap();
    let mut batch = vec![script(1, &["w:a=1"])];
    coordinator.process_batch(&mut batch).unwrap();

    assert!(first.is_empty());
    assert_eq!(second.get(b"a").unwrap().as_deref(), Some(b"1".as_ref()));
}

#[test]
fn test_reset_reserve_table() {
    let db = Arc::new(MemoryDb::new("scenario"));
    let mut coordinator = AriaCoordinator::with_registry(2, db, registry()).unwrap();

    let mut batch = vec![script(1, &["w:a=1"])];
    coordinator.process_batch(&mut batch).unwrap();
    let old = Arc::clone(coordinator.strategy());
    assert_eq!(old.table().write_owner(b"a"), Some(tid(1)));

    coordinator.reset_reserve_table().unwrap();
    assert!(!Arc::ptr_eq(&old, coordinator.strategy()));
    assert_eq!(coordinator.strategy().table().write_len(), 0);

    // workers reserve into the new table
    let mut batch = vec![script(7, &["w:b=1"])];
    coordinator.process_batch(&mut batch).unwrap();
    assert_eq!(coordinator.strategy().table().write_owner(b"b"), Some(tid(7)));
    assert_eq!(old.table().write_owner(b"b"), None);
}

#[test]
fn test_process_validated_requests() {
    let db = Arc::new(MemoryDb::new("scenario"));
    seed_accounts(&db, 4, 1000);
    let mut coordinator = AriaCoordinator::new(2, db.clone()).unwrap();

    let requests = [
        UserRequest::new("transfer", "transfer", ["0", "1"]),
        UserRequest::new("transfer", "transfer", ["1", "2", "5"]),
        UserRequest::new("kv", "get", ["missing"]),
    ];
    let mut envelopes: Vec<Envelope> = requests
        .iter()
        .map(|r| Envelope::from_request(r).unwrap())
        .collect();
    envelopes.push(Envelope {
        payload: "not a request".into(),
        ..Default::default()
    });

    let digests: Vec<_> = envelopes.iter().map(|e| e.digest()).collect();
    let results = coordinator.process_validated_requests(envelopes).unwrap();

    assert_eq!(results.len(), 4);
    let result_digests: Vec<_> = results.iter().map(|r| r.envelope.digest()).collect();
    assert_eq!(result_digests, digests);
    for (result, digest) in results.iter().zip(&digests) {
        assert_eq!(result.rw_set.request_digest, *digest);
        assert_eq!(result.committed, result.rw_set.ret_code.is_commit());
    }
    assert_eq!(results[2].rw_set.ret_code, ExecutionResult::AbortNoRetry);
    assert_eq!(results[3].rw_set.ret_code, ExecutionResult::AbortNoRetry);
    assert_eq!(total_balance(&db), 4000);
}
