// Skip list: insert, lookup, ordered traversal, predecessor search, size
// accounting.

use rangekv::memtable::skiplist::SkipList;

type ByteList = SkipList<Vec<u8>, Vec<u8>>;

fn key_at(sl: &ByteList, idx: Option<usize>) -> Option<&[u8]> {
    idx.map(|i| sl.entry(i).0.as_slice())
}

// =============================================================================
// Test 1: Insert one key, get it back
// =============================================================================
#[test]
fn insert_one_key_get_it_back() {
    let mut sl = ByteList::new();
    sl.insert(b"hello".to_vec(), b"world".to_vec());
    assert_eq!(sl.get(b"hello".as_slice()), Some(&b"world".to_vec()));
    assert_eq!(sl.len(), 1);
}

// =============================================================================
// Test 2: Duplicate key overwrites and returns the old value
// =============================================================================
#[test]
fn insert_duplicate_key_overwrites() {
    let mut sl = ByteList::new();
    assert_eq!(sl.insert(b"key".to_vec(), b"old".to_vec()), None);
    assert_eq!(sl.insert(b"key".to_vec(), b"new".to_vec()), Some(b"old".to_vec()));
    assert_eq!(sl.get(b"key".as_slice()), Some(&b"new".to_vec()));
    assert_eq!(sl.len(), 1);
}

// =============================================================================
// Test 3: 1000 shuffled keys come back sorted
// =============================================================================
#[test]
fn iteration_is_sorted_regardless_of_insert_order() {
    let mut sl = ByteList::new();
    // 7 is coprime with 1000, so this visits every i exactly once
    for i in 0..1000u32 {
        let n = (i * 7) % 1000;
        sl.insert(format!("key_{:05}", n).into_bytes(), n.to_be_bytes().to_vec());
    }

    let keys: Vec<&Vec<u8>> = sl.iter().map(|(k, _)| k).collect();
    assert_eq!(keys.len(), 1000);
    assert!(keys.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(sl.get(b"key_00999".as_slice()), Some(&999u32.to_be_bytes().to_vec()));
    assert_eq!(sl.get(b"key_01000".as_slice()), None);
}

// =============================================================================
// Test 4: seek / find_less_than bracket a missing key
// =============================================================================
#[test]
fn seek_and_predecessor_bracket_missing_key() {
    let sl: ByteList = [b"b", b"d", b"f"]
        .into_iter()
        .map(|k| (k.to_vec(), Vec::new()))
        .collect();

    assert_eq!(key_at(&sl, sl.seek(b"c".as_slice())), Some(b"d".as_slice()));
    assert_eq!(key_at(&sl, sl.find_less_than(b"c".as_slice())), Some(b"b".as_slice()));
    assert_eq!(key_at(&sl, sl.seek(b"d".as_slice())), Some(b"d".as_slice()));
    assert_eq!(key_at(&sl, sl.find_less_than(b"d".as_slice())), Some(b"b".as_slice()));

    assert_eq!(sl.seek(b"g".as_slice()), None);
    assert_eq!(sl.find_less_than(b"a".as_slice()), None);
    assert_eq!(key_at(&sl, sl.first()), Some(b"b".as_slice()));
    assert_eq!(key_at(&sl, sl.last()), Some(b"f".as_slice()));
}

// =============================================================================
// Test 5: next_of walks level 0
// =============================================================================
#[test]
fn next_of_walks_in_order() {
    let sl: ByteList = (0..50u8).rev().map(|b| (vec![b], vec![b])).collect();

    let mut seen = Vec::new();
    let mut current = sl.first();
    while let Some(idx) = current {
        seen.push(sl.entry(idx).0[0]);
        current = sl.next_of(idx);
    }
    assert_eq!(seen, (0..50u8).collect::<Vec<_>>());
}

// =============================================================================
// Test 6: Size grows with inserts and tracks overwrites
// =============================================================================
#[test]
fn size_tracks_bytes() {
    let mut sl = ByteList::new();
    assert_eq!(sl.size_bytes(), 0);

    sl.insert(b"key".to_vec(), vec![0; 100]);
    let one = sl.size_bytes();
    assert!(one >= 103);

    sl.insert(b"key".to_vec(), vec![0; 10]);
    assert_eq!(sl.size_bytes(), one - 90);

    sl.insert(b"other".to_vec(), vec![0; 10]);
    assert!(sl.size_bytes() > one - 90);
}

// =============================================================================
// Test 7: into_sorted_vec drains in key order
// =============================================================================
#[test]
fn into_sorted_vec_drains_in_order() {
    let sl: ByteList = [b"c", b"a", b"b"]
        .into_iter()
        .map(|k| (k.to_vec(), k.to_vec()))
        .collect();
    let drained = sl.into_sorted_vec();
    let keys: Vec<_> = drained.iter().map(|(k, _)| k.as_slice()).collect();
    assert_eq!(keys, vec![b"a".as_slice(), b"b", b"c"]);
}
