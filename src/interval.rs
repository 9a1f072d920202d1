//! Half-open key ranges `[start, end)` over [`Key`].

use std::cmp::Ordering;
use std::fmt;

use crate::key::{self, Key};

/// A half-open interval of keys. Contains `k` iff `start <= k < end`.
///
/// Invariant: `start <= end`. Construction never fails: an inverted range
/// normalizes to [`Interval::nothing`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interval {
    start: Key,
    end: Key,
}

impl Interval {
    /// `[start, end)`, or `nothing()` when `start > end`.
    pub fn new(start: impl Into<Key>, end: impl Into<Key>) -> Self {
        let (start, end) = (start.into(), end.into());
        if start > end {
            return Interval::nothing();
        }
        Interval { start, end }
    }

    /// Build from bounds the caller has already ordered.
    pub fn new_unchecked(start: Key, end: Key) -> Self {
        debug_assert!(start <= end, "inverted interval {start:?}..{end:?}");
        Interval { start, end }
    }

    /// The closed interval `[start, end]`, i.e. `[start, end.first_child())`.
    pub fn through(start: impl Into<Key>, end: impl Into<Key>) -> Self {
        Interval::new(start, end.into().first_child())
    }

    /// `["", Infinity)`: every finite key.
    pub fn everything() -> Self {
        Interval {
            start: Key::empty(),
            end: Key::Infinity,
        }
    }

    /// `[Infinity, Infinity)`.
    pub fn nothing() -> Self {
        Interval {
            start: Key::Infinity,
            end: Key::Infinity,
        }
    }

    pub fn start(&self) -> &Key {
        &self.start
    }

    pub fn end(&self) -> &Key {
        &self.end
    }

    pub fn into_bounds(self) -> (Key, Key) {
        (self.start, self.end)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// `start <= key < end`. Infinity is never contained.
    pub fn contains(&self, key: &Key) -> bool {
        self.start <= *key && *key < self.end
    }

    /// Finite-bytes shorthand for [`Interval::contains`].
    pub fn contains_bytes(&self, key: &[u8]) -> bool {
        match &self.start {
            Key::Bytes(start) if start.as_slice() > key => false,
            Key::Infinity => false,
            _ => match &self.end {
                Key::Bytes(end) => key < end.as_slice(),
                Key::Infinity => true,
            },
        }
    }

    /// `start < key <= end`: whether the position just before `key` lies in
    /// the interval.
    pub fn contains_before(&self, key: &Key) -> bool {
        self.start < *key && *key <= self.end
    }

    /// Where the interval lies relative to `key`: `Equal` if it contains
    /// `key`, `Less` if it ends at or before `key`, `Greater` if it starts
    /// after it.
    pub fn compare_to_key(&self, key: &Key) -> Ordering {
        if self.contains(key) {
            Ordering::Equal
        } else if self.end <= *key {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    }

    /// Pull `key` into `[start, end]`.
    pub fn clamp_key<'a>(&'a self, key: &'a Key) -> &'a Key {
        key::max(&self.start, key::min(key, &self.end))
    }

    /// The part of `self` covered by `other`.
    ///
    /// Both bounds of `other` are clamped into `[self.start, self.end]`, so the
    /// result is always a sub-range of `self`. When the two do not overlap the
    /// result is the empty interval at the edge of `self` nearest to `other`.
    pub fn clamp(&self, other: &Interval) -> Interval {
        let start = self.clamp_key(&other.start).clone();
        let end = self.clamp_key(&other.end).clone();
        Interval::new_unchecked(start, end)
    }

    /// Re-express the interval relative to `prefix`.
    ///
    /// A bound that carries `prefix` loses it. A start bound below the prefix
    /// becomes `""`; every other bound that does not carry the prefix becomes
    /// infinity.
    pub fn strip_prefix(&self, prefix: &[u8]) -> Interval {
        let start = match &self.start {
            Key::Bytes(bytes) if bytes.starts_with(prefix) => Key::from(&bytes[prefix.len()..]),
            Key::Bytes(bytes) if bytes.as_slice() < prefix => Key::empty(),
            _ => Key::Infinity,
        };
        let end = match &self.end {
            Key::Bytes(bytes) if bytes.starts_with(prefix) => Key::from(&bytes[prefix.len()..]),
            _ => Key::Infinity,
        };
        Interval::new(start, end)
    }

    /// Translate into the key space nested under `prefix`: each bound gets
    /// `prefix` prepended, and infinity becomes `prefix.next_sibling()`.
    pub fn with_prefix(&self, prefix: &[u8]) -> Interval {
        if prefix.is_empty() {
            return self.clone();
        }
        Interval::new(self.start.prefixed_by(prefix), self.end.prefixed_by(prefix))
    }
}

impl Default for Interval {
    fn default() -> Self {
        Interval::everything()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
