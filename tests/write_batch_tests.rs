// WriteBatch: insertion-order replay, prefixed views over one buffer,
// pending-state queries and atomic application.

use rangekv::batch::Edit;
use rangekv::{Db, Options, StorageEngine, WriteBatch, WriteOptions};

fn replay(batch: &WriteBatch) -> Vec<(Vec<u8>, Option<Vec<u8>>)> {
    let mut seen = Vec::new();
    batch.enumerate(|k, v| seen.push((k.to_vec(), v.map(<[u8]>::to_vec))));
    seen
}

// =============================================================================
// Test 1: Put then delete replays in insertion order
// =============================================================================
#[test]
fn replays_in_insertion_order() {
    let batch = WriteBatch::new();
    batch.set(b"x", Some(b"v".as_slice()));
    batch.remove(b"y");
    batch.put(b"a", b"later");

    assert_eq!(
        replay(&batch),
        vec![
            (b"x".to_vec(), Some(b"v".to_vec())),
            (b"y".to_vec(), None),
            (b"a".to_vec(), Some(b"later".to_vec())),
        ]
    );
    assert_eq!(batch.len(), 3);
}

// =============================================================================
// Test 2: Prefixed views share one buffer
// =============================================================================
#[test]
fn prefixed_views_share_the_buffer() {
    let batch = WriteBatch::new();
    let users = batch.prefixed(b"users/");
    let admins = users.prefixed(b"admin/");

    users.put(b"1", b"ann");
    admins.put(b"2", b"bob");
    batch.put(b"top", b"level");

    assert_eq!(batch.len(), 3);
    assert_eq!(users.len(), 3);
    assert_eq!(admins.prefix(), b"users/admin/");

    // each view replays only what falls under its prefix
    let user_keys: Vec<Vec<u8>> = replay(&users).into_iter().map(|(k, _)| k).collect();
    assert_eq!(user_keys, vec![b"1".to_vec(), b"admin/2".to_vec()]);
    assert_eq!(replay(&admins), vec![(b"2".to_vec(), Some(b"bob".to_vec()))]);

    assert_eq!(
        batch.edits()[1],
        Edit::Put {
            key: b"users/admin/2".to_vec(),
            value: b"bob".to_vec(),
        }
    );
}

// =============================================================================
// Test 3: get and diff report the last edit per key
// =============================================================================
#[test]
fn pending_state_queries() {
    let batch = WriteBatch::new();
    batch.put(b"k", b"1");
    batch.put(b"k", b"2");
    batch.put(b"gone", b"x");
    batch.remove(b"gone");

    assert_eq!(batch.get(b"k"), Some(Some(b"2".to_vec())));
    assert_eq!(batch.get(b"gone"), Some(None));
    assert_eq!(batch.get(b"untouched"), None);

    let diff = batch.diff();
    assert_eq!(diff.len(), 2);
    assert_eq!(diff[b"gone".as_slice()], None);
    assert_eq!(diff[b"k".as_slice()], Some(b"2".to_vec()));
}

// =============================================================================
// Test 4: clear empties every view
// =============================================================================
#[test]
fn clear_empties_all_views() {
    let batch = WriteBatch::new();
    let view = batch.prefixed(b"p");
    view.put(b"1", b"a");
    batch.put(b"2", b"b");

    view.clear();
    assert!(batch.is_empty());
    assert!(replay(&view).is_empty());
}

// =============================================================================
// Test 5: A written batch lands atomically with consecutive sequences
// =============================================================================
#[test]
fn write_applies_all_edits() {
    let db = Db::open_in_memory(Options::default()).unwrap();
    db.put(b"old", b"x").unwrap();
    let before = db.snapshot();

    let batch = WriteBatch::new();
    batch.prefixed(b"n/").put(b"1", b"one");
    batch.put(b"k", b"first");
    batch.put(b"k", b"second");
    batch.remove(b"old");
    db.write(&batch, WriteOptions { sync: true }).unwrap();

    assert_eq!(db.get(b"n/1").unwrap(), Some(b"one".to_vec()));
    assert_eq!(db.get(b"k").unwrap(), Some(b"second".to_vec()));
    assert_eq!(db.get(b"old").unwrap(), None);
    assert_eq!(db.stats().last_sequence, 5);

    // the earlier snapshot sees none of it
    assert_eq!(before.keys().unwrap(), vec![b"old".to_vec()]);
}

// =============================================================================
// Test 6: Writing an empty batch is a no-op
// =============================================================================
#[test]
fn empty_batch_is_noop() {
    let db = Db::open_in_memory(Options::default()).unwrap();
    db.write(&WriteBatch::new(), WriteOptions::default()).unwrap();
    assert_eq!(db.stats().last_sequence, 0);
    assert_eq!(db.stats().batches_written, 0);
}
