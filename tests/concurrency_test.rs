// Concurrent writers against one on-disk ledger.
// Each thread opens its own connection, so serialization comes from SQLite's
// write lock rather than the in-process mutex.

use item_ledger::{normalize_item, Ledger, LineItem, ValidRow, MAX_LIST_LIMIT};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

fn row(name: &str, price: f64, quantity: i64) -> ValidRow {
    normalize_item(&LineItem::new(name, price, quantity)).unwrap()
}

fn temp_ledger() -> (tempfile::TempDir, PathBuf, Ledger) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    let ledger = Ledger::open_with_timeout(&path, BUSY_TIMEOUT).unwrap();
    (dir, path, ledger)
}

fn open(path: &Path) -> Ledger {
    Ledger::open_with_timeout(path, BUSY_TIMEOUT).unwrap()
}

fn quantity_of(ledger: &Ledger, name: &str) -> i64 {
    ledger
        .list(Some(MAX_LIST_LIMIT))
        .unwrap()
        .into_iter()
        .find(|item| item.name.eq_ignore_ascii_case(name))
        .map(|item| item.quantity)
        .unwrap_or(0)
}

#[test]
fn concurrent_batches_never_lose_updates() {
    let (_dir, path, ledger) = temp_ledger();
    let threads = 4;
    let rounds = 25;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let path = path.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let ledger = open(&path);
                barrier.wait();
                for _ in 0..rounds {
                    ledger
                        .bulk_accumulate(&[row("Widget", 10.00, 1), row("gadget", 2.50, 2)])
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(ledger.count().unwrap(), 2);
    assert_eq!(quantity_of(&ledger, "widget"), (threads * rounds) as i64);
    assert_eq!(quantity_of(&ledger, "gadget"), (threads * rounds * 2) as i64);
}

#[test]
fn concurrent_merges_into_one_target_serialize() {
    let (_dir, path, ledger) = temp_ledger();
    let sources = 8;

    ledger.bulk_accumulate(&[row("Target", 5.00, 1)]).unwrap();
    let source_rows: Vec<ValidRow> = (0..sources)
        .map(|i| row(&format!("Source {}", i), 1.00, 1))
        .collect();
    ledger.bulk_accumulate(&source_rows).unwrap();

    // Target is id 1, sources are ids 2..=sources+1
    let barrier = Arc::new(Barrier::new(sources));
    let handles: Vec<_> = (0..sources)
        .map(|i| {
            let path = path.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let ledger = open(&path);
                barrier.wait();
                ledger
                    .update_with_merge(i as i64 + 2, &row("target", 5.00, 1))
                    .unwrap()
            })
        })
        .collect();

    for handle in handles {
        let outcome = handle.join().unwrap();
        assert!(outcome.merged);
        assert_eq!(outcome.item.id, 1);
    }

    let items = ledger.list(None).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, 1);
    assert_eq!(items[0].quantity, 1 + sources as i64);
}

#[test]
fn merges_and_batches_interleave_without_losing_quantity() {
    let (_dir, path, ledger) = temp_ledger();
    let sources = 10;

    ledger.bulk_accumulate(&[row("Hub", 3.00, 1)]).unwrap();
    let source_rows: Vec<ValidRow> = (0..sources)
        .map(|i| row(&format!("Spoke {}", i), 3.00, 2))
        .collect();
    ledger.bulk_accumulate(&source_rows).unwrap();

    let merger = {
        let path = path.clone();
        thread::spawn(move || {
            let ledger = open(&path);
            for id in 2..(sources as i64 + 2) {
                ledger.update_with_merge(id, &row("HUB", 3.00, 2)).unwrap();
            }
        })
    };
    let feeder = {
        let path = path.clone();
        thread::spawn(move || {
            let ledger = open(&path);
            for _ in 0..20 {
                ledger.bulk_accumulate(&[row("hub ", 3.00, 1)]).unwrap();
            }
        })
    };

    merger.join().unwrap();
    feeder.join().unwrap();

    // 1 initial + 2 per merged spoke + 1 per fed batch
    assert_eq!(ledger.count().unwrap(), 1);
    assert_eq!(quantity_of(&ledger, "hub"), 1 + 2 * sources as i64 + 20);
}

#[test]
fn shared_handle_across_threads() {
    let ledger = Ledger::open_in_memory().unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let ledger = ledger.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    ledger.bulk_accumulate(&[row("Bolt", 0.25, 1)]).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(quantity_of(&ledger, "bolt"), 200);
}
