//! Two panes racing for the same top item: exactly one claim succeeds, the
//! loser observes the item as absent and proceeds (here: to "no work").

use std::sync::{Arc, Barrier};

use qsf_queue::QueueRoot;
use qsf_schemas::{Priority, QueueItem, QueueName, WorkerRole};
use serde_json::json;

#[test]
fn exactly_one_claimant_wins() {
    let dir = tempfile::tempdir().unwrap();
    let root = QueueRoot::new(dir.path().join("queues"));
    root.ensure_layout().unwrap();

    let item = QueueItem::new(WorkerRole::Researcher, 1, Priority::High, json!({}));
    root.push(QueueName::Hypotheses, &item).unwrap();

    const RACERS: u32 = 8;
    let barrier = Arc::new(Barrier::new(RACERS as usize));

    let handles: Vec<_> = (0..RACERS)
        .map(|pane| {
            let root = root.clone();
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                root.claim(&[QueueName::Hypotheses], pane + 10, WorkerRole::Backtester)
                    .unwrap()
                    .map(|c| c.item().id.clone())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_some()).count();
    let losers = results.iter().filter(|r| r.is_none()).count();

    assert_eq!(winners, 1, "exactly one rename wins");
    assert_eq!(losers, (RACERS - 1) as usize);
}

#[test]
fn loser_proceeds_to_the_next_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let root = QueueRoot::new(dir.path().join("queues"));
    root.ensure_layout().unwrap();

    // Two items; both racers claim; each must end up with a different one.
    let a = QueueItem::new(WorkerRole::Researcher, 1, Priority::High, json!({"n": 1}));
    let b = QueueItem::new(WorkerRole::Researcher, 1, Priority::High, json!({"n": 2}));
    root.push(QueueName::Hypotheses, &a).unwrap();
    root.push(QueueName::Hypotheses, &b).unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = [2u32, 3u32]
        .into_iter()
        .map(|pane| {
            let root = root.clone();
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                root.claim(&[QueueName::Hypotheses], pane, WorkerRole::Backtester)
                    .unwrap()
                    .map(|c| c.item().id.clone())
            })
        })
        .collect();

    let mut ids: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().unwrap().expect("two items, two winners"))
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 2, "no double-claim of one item");
}
