//! Two sessions ending at the same instant must both land their entries:
//! the category lock serializes appenders, and the file never loses or
//! interleaves blocks.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use qsf_patterns::{EntryKind, PatternCategory, PatternEntry, PatternStore};

fn entry(n: usize) -> PatternEntry {
    PatternEntry {
        kind: EntryKind::Success,
        recorded_at: Utc::now(),
        market: "futures".into(),
        instruments: vec![format!("SYM{n}")],
        metrics: BTreeMap::from([("sharpe_oos".to_string(), 1.0 + n as f64 / 100.0)]),
        notes: format!("writer {n}"),
    }
}

#[test]
fn concurrent_appenders_all_land() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(PatternStore::new(dir.path()));

    const WRITERS: usize = 8;
    const PER_WRITER: usize = 5;

    let handles: Vec<_> = (0..WRITERS)
        .map(|w| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..PER_WRITER {
                    store
                        .append(PatternCategory::WhatWorks, &entry(w * PER_WRITER + i))
                        .expect("append under contention");
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    let entries = store.read(PatternCategory::WhatWorks).unwrap();
    assert_eq!(entries.len(), WRITERS * PER_WRITER, "no entry lost");

    // Every writer's notes are present exactly once.
    let mut notes: Vec<_> = entries.iter().map(|e| e.notes.clone()).collect();
    notes.sort();
    notes.dedup();
    assert_eq!(notes.len(), WRITERS * PER_WRITER);
}
