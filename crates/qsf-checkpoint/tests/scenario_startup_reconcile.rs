//! Startup reconciliation: a recorded claim with no matching claimed file
//! is cleared; a claim whose file still exists is resumed.

use chrono::Utc;
use qsf_checkpoint::{Checkpoint, CheckpointStore, ResumeAction};
use qsf_queue::QueueRoot;
use qsf_schemas::{Priority, QueueItem, QueueName, WorkerRole};
use serde_json::json;

fn scaffold() -> (tempfile::TempDir, CheckpointStore, QueueRoot) {
    let dir = tempfile::tempdir().unwrap();
    let store = CheckpointStore::new(dir.path().join("checkpoints"));
    let queues = QueueRoot::new(dir.path().join("queues"));
    queues.ensure_layout().unwrap();
    (dir, store, queues)
}

#[test]
fn stale_recorded_claim_is_cleared() {
    let (_dir, store, queues) = scaffold();

    let mut cp = Checkpoint::fresh(2, WorkerRole::Backtester, Utc::now());
    cp.last_claimed_item = Some(qsf_schemas::ItemId::from_raw("bt-20260201-110000-000001"));
    store.save(&cp).unwrap();

    match store.reconcile(2, &queues).unwrap() {
        ResumeAction::ClearedStale(id) => {
            assert_eq!(id.as_str(), "bt-20260201-110000-000001")
        }
        other => panic!("expected ClearedStale, got {other:?}"),
    }

    // The record no longer names a claim.
    let back = store.load(2).unwrap().unwrap();
    assert!(back.last_claimed_item.is_none());
    assert_eq!(store.reconcile(2, &queues).unwrap(), ResumeAction::Fresh);
}

#[test]
fn live_claim_is_resumed() {
    let (_dir, store, queues) = scaffold();

    let item = QueueItem::new(WorkerRole::Converter, 1, Priority::Medium, json!({}));
    queues.push(QueueName::ToBacktest, &item).unwrap();
    let claimed = queues
        .claim(&[QueueName::ToBacktest], 4, WorkerRole::Backtester)
        .unwrap()
        .unwrap();
    let id = claimed.item().id.clone();
    // Simulate a crash: the claim file stays, the process dies.
    drop(claimed);

    let mut cp = Checkpoint::fresh(4, WorkerRole::Backtester, Utc::now());
    cp.last_claimed_item = Some(id.clone());
    store.save(&cp).unwrap();

    assert_eq!(
        store.reconcile(4, &queues).unwrap(),
        ResumeAction::Resume(id)
    );
}

#[test]
fn no_checkpoint_means_fresh() {
    let (_dir, store, queues) = scaffold();
    assert_eq!(store.reconcile(9, &queues).unwrap(), ResumeAction::Fresh);
}
