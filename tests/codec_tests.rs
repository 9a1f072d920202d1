// Order-preserving encodings and the typed views built on them.

use std::fmt::Debug;

use rangekv::codec::{f64_from_ordered, f64_to_ordered};
use rangekv::{Codec, Db, Options, StorageEngine, TypedBatch, WriteBatch, WriteOptions};

/// Every value survives a round trip, and equality and order agree with
/// the byte order of the encodings for every pair.
fn check_order<T: Codec + PartialOrd + Debug>(values: &[T]) {
    for a in values {
        let x = a.encode();
        let back = T::decode(&x).unwrap();
        assert!(back == *a, "{:?} decoded as {:?}", a, back);
        assert_eq!(back.encode(), x, "{:?} re-encoded differently", a);

        for b in values {
            let y = b.encode();
            assert_eq!(a == b, x == y, "{:?} and {:?} equate differently from {:?} and {:?}", a, b, x, y);
            assert_eq!(a < b, x < y, "{:?} < {:?} disagrees with {:?} < {:?}", a, b, x, y);
        }
    }
}

// DBL_TRUE_MIN: the least positive subnormal.
const TRUE_MIN: f64 = 5e-324;

fn doubles() -> Vec<f64> {
    vec![
        f64::NEG_INFINITY,
        -f64::MAX,
        -1.0e10,
        -2015.0,
        -20.1,
        -2.0,
        -1.0,
        -0.5,
        -3.0 * f64::MIN_POSITIVE,
        -f64::MIN_POSITIVE,
        -f64::MIN_POSITIVE + TRUE_MIN,
        -TRUE_MIN,
        -0.0,
        0.0,
        TRUE_MIN,
        2.0 * TRUE_MIN,
        f64::MIN_POSITIVE - TRUE_MIN,
        f64::MIN_POSITIVE,
        0.5 * (2.0 - f64::EPSILON),
        1.0,
        1.0 + f64::EPSILON,
        2.0,
        2015.0,
        1e100,
        f64::MAX,
        f64::INFINITY,
    ]
}

// =============================================================================
// Test 1: f64 order survives the transform, zero signs collapse, NaN is last
// =============================================================================
#[test]
fn f64_order_preserving() {
    let values = doubles();
    for &x in &values {
        let ordered = f64_to_ordered(x);
        let back = f64_from_ordered(ordered);
        assert_eq!(back, x);
        assert_eq!(f64_to_ordered(back), ordered);
    }
    for &x in &values {
        for &y in &values {
            assert_eq!(x < y, f64_to_ordered(x) < f64_to_ordered(y), "x={:e}, y={:e}", x, y);
        }
    }

    assert_eq!(f64_to_ordered(-0.0), f64_to_ordered(0.0));
    assert!(f64_from_ordered(f64_to_ordered(f64::NAN)).is_nan());
    assert!(f64_to_ordered(f64::NAN) > f64_to_ordered(f64::INFINITY));
    check_order(&values);
}

// =============================================================================
// Test 2: Unsigned integers are big-endian
// =============================================================================
#[test]
fn unsigned_order() {
    let small: [u64; 16] = [0, 1, 2, 10, 16, 31, 32, 33, 63, 64, 65, 127, 128, 129, 254, 255];

    check_order(&small.map(|v| v as u8));
    let mut wide: Vec<u64> = small.to_vec();
    wide.extend([10_000, u16::MAX as u64]);
    check_order(&wide.iter().map(|&v| v as u16).collect::<Vec<_>>());
    wide.push(u32::MAX as u64);
    check_order(&wide.iter().map(|&v| v as u32).collect::<Vec<_>>());
    wide.push(u64::MAX);
    check_order(&wide);
    check_order(&[0usize, 1, 255, 256, 70_000, usize::MAX]);

    assert_eq!(0x0102u16.encode(), vec![0x01, 0x02]);
}

// =============================================================================
// Test 3: Signed integers keep two's-complement order
// =============================================================================
#[test]
fn signed_order() {
    check_order(&[-128i8, -127, -1, 0, 1, 2, 10, 16, 31, 32, 33, 63, 64, 65, 127]);

    let middle: [i64; 19] = [-1, 0, 1, 2, 10, 16, 31, 32, 33, 63, 64, 65, 127, 128, 129, 254, 255, 10_000, -10_000];
    let with_edges = |min: i64, max: i64| {
        let mut values = vec![min, min + 1];
        values.extend(middle);
        values.push(max);
        values
    };
    check_order(&with_edges(i16::MIN as i64, i16::MAX as i64).iter().map(|&v| v as i16).collect::<Vec<_>>());
    check_order(&with_edges(i32::MIN as i64, i32::MAX as i64).iter().map(|&v| v as i32).collect::<Vec<_>>());
    check_order(&with_edges(i64::MIN, i64::MAX));
    check_order(&[isize::MIN, -1, 0, 1, isize::MAX]);

    assert_eq!((-1i16).encode(), vec![0x7F, 0xFF]);
    assert_eq!(1i16.encode(), vec![0x80, 0x01]);
}

// =============================================================================
// Test 4: Strings and byte vectors compare as their bytes
// =============================================================================
#[test]
fn strings_and_bytes_order() {
    let strings: Vec<String> = [
        "", " ", "!", "0", "A", "A!", "Aa!", "a", "askfjhsf", "gklja", "gklja a!",
        "oqiwu aslkjh asu qyw", "z", "~ ~~~", "~a~~~", "~~~~", "E", "Ë", "EE", "EË", "ËE", "ËË",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    check_order(&strings);

    let bytes: Vec<Vec<u8>> = vec![
        vec![],
        vec![0],
        vec![0, 0],
        vec![0, 0, 0],
        vec![0, 1],
        vec![1],
        vec![1, 0],
        vec![1, 2, 3],
        vec![2],
        vec![255],
        vec![255, 0],
        vec![255, 255, 255, 255],
    ];
    check_order(&bytes);
}

// =============================================================================
// Test 5: Bytes that are not an encoding of the type are corruption
// =============================================================================
#[test]
fn malformed_bytes_are_corruption() {
    assert!(u64::decode(&[0; 7]).unwrap_err().is_corruption());
    assert!(i16::decode(&[]).unwrap_err().is_corruption());
    assert!(f64::decode(&[0; 9]).unwrap_err().is_corruption());
    assert_eq!(String::decode(&[0xC3, 0x28]).unwrap_err().code(), 2);
    assert_eq!(u8::decode(&[7]).unwrap(), 7);
}

// =============================================================================
// Test 6: Signed key ranges clamp a typed view
// =============================================================================
#[test]
fn typed_view_over_signed_keys() {
    let db = Db::open_in_memory(Options::default()).unwrap();
    let batch = TypedBatch::<i64, String>::new();
    for k in [250i64, -300, 7, -1, 0, 1, -20] {
        batch.put(&k, &format!("v{}", k));
    }
    db.write(batch.untyped(), WriteOptions::default()).unwrap();

    let view = db.snapshot().typed::<i64, String>();
    assert_eq!(view.keys().unwrap(), vec![-300, -20, -1, 0, 1, 7, 250]);
    assert_eq!(view.range(-20..1).keys().unwrap(), vec![-20, -1, 0]);
    assert_eq!(view.range(-20..=1).reversed().keys().unwrap(), vec![1, 0, -1, -20]);
    assert_eq!(view.range(..0).keys().unwrap(), vec![-300, -20, -1]);
    assert_eq!(view.after(&0).keys().unwrap(), vec![1, 7, 250]);

    assert_eq!(view.get(&-20).unwrap(), Some("v-20".to_string()));
    assert_eq!(view.range(0..).get(&-20).unwrap(), None);
    assert!(view.contains_key(&250).unwrap());

    // floor and ceiling entries of 5
    assert_eq!(view.range(..=5).reversed().first().unwrap(), Some((1, "v1".to_string())));
    assert_eq!(view.range(5..).first().unwrap(), Some((7, "v7".to_string())));
    assert_eq!(view.range(251..).first().unwrap(), None);
}

// =============================================================================
// Test 7: f64 keys under a byte prefix, mixed with untyped edits
// =============================================================================
#[test]
fn typed_view_over_f64_keys() {
    let db = Db::open_in_memory(Options::default()).unwrap();
    let raw = WriteBatch::new();
    let temps = raw.prefixed(b"temps/").typed::<f64, u32>();
    for (i, t) in [3.25, -12.5, f64::INFINITY, -0.5, 0.0].into_iter().enumerate() {
        temps.put(&t, &(i as u32));
    }
    raw.put(b"other", b"x");
    assert_eq!(raw.len(), 6);
    db.write(&raw, WriteOptions::default()).unwrap();

    let view = db.snapshot().prefixed(b"temps/").typed::<f64, u32>();
    assert_eq!(view.keys().unwrap(), vec![-12.5, -0.5, 0.0, 3.25, f64::INFINITY]);
    assert_eq!(view.range(-1.0..4.0).keys().unwrap(), vec![-0.5, 0.0, 3.25]);
    assert_eq!(view.range(-1.0..4.0).values().unwrap(), vec![3, 4, 0]);
    // -0.0 and 0.0 name the same key
    assert_eq!(view.get(&-0.0).unwrap(), Some(4));
    assert_eq!(db.get(b"other").unwrap(), Some(b"x".to_vec()));
}

// =============================================================================
// Test 8: A typed batch shares its buffer and replays decoded edits
// =============================================================================
#[test]
fn typed_batch_pending_edits() {
    let batch = WriteBatch::new();
    let counts = batch.prefixed(b"n/").typed::<u16, i32>();
    counts.put(&2, &-7);
    counts.remove(&9);
    counts.set(&2, Some(&40));

    assert_eq!(counts.get(&2).unwrap(), Some(Some(40)));
    assert_eq!(counts.get(&9).unwrap(), Some(None));
    assert_eq!(counts.get(&3).unwrap(), None);
    assert_eq!(counts.pending().unwrap(), vec![(2, Some(-7)), (9, None), (2, Some(40))]);

    assert_eq!(batch.len(), 3);
    assert_eq!(batch.get(b"n/\x00\x02"), Some(Some(40i32.encode())));

    counts.clear();
    assert!(batch.is_empty());
}

// =============================================================================
// Test 9: A stored pair that does not decode is reported, not skipped
// =============================================================================
#[test]
fn undecodable_pair_is_an_error() {
    let db = Db::open_in_memory(Options::default()).unwrap();
    db.put(b"ids/\x00\x00\x00\x01", b"one").unwrap();
    db.put(b"ids/bad", b"x").unwrap();

    let ids = db.snapshot().prefixed(b"ids/").typed::<u32, String>();
    let items: Vec<_> = ids.iter().unwrap().collect();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), &(1, "one".to_string()));
    assert!(items[1].as_ref().unwrap_err().is_corruption());
    assert!(ids.keys().unwrap_err().is_corruption());
}
