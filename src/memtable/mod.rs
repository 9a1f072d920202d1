pub mod skiplist;

use std::collections::HashSet;

use skiplist::{ApproxSize, SkipList};
use xxhash_rust::xxh3::xxh3_64;

use crate::types::{InternalKey, MAX_SEQUENCE, SequenceNumber, ValueType};

/// A stored value with its content checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub value: Vec<u8>,
    pub checksum: u64,
}

impl Slot {
    pub fn new(value: Vec<u8>) -> Self {
        let checksum = xxh3_64(&value);
        Slot { value, checksum }
    }

    /// Whether the bytes still hash to the recorded checksum.
    pub fn verify(&self) -> bool {
        xxh3_64(&self.value) == self.checksum
    }
}

impl ApproxSize for Slot {
    fn approx_size(&self) -> usize {
        self.value.len()
    }
}

impl ApproxSize for InternalKey {
    fn approx_size(&self) -> usize {
        self.user_key.len()
    }
}

/// Result of a point lookup at a sequence number.
#[derive(Debug, PartialEq, Eq)]
pub enum Lookup<'a> {
    Found(&'a Slot),
    /// The newest visible version is a tombstone.
    Deleted,
    Missing,
}

/// Multi-version sorted store of every live edit.
///
/// Entries are keyed by [`InternalKey`], so all versions of a user key sit
/// together, newest first. A read at sequence `s` sees, per user key, the
/// newest version with `sequence <= s`; a tombstone there hides the key.
pub struct MemTable {
    data: SkipList<InternalKey, Slot>,
}

impl MemTable {
    pub fn new() -> Self {
        MemTable {
            data: SkipList::new(),
        }
    }

    /// Record one edit. A delete stores a tombstone with an empty value.
    pub fn add(&mut self, sequence: SequenceNumber, value_type: ValueType, key: Vec<u8>, value: Vec<u8>) {
        let value = match value_type {
            ValueType::Put => value,
            ValueType::Delete => Vec::new(),
        };
        self.data
            .insert(InternalKey::new(key, sequence, value_type), Slot::new(value));
    }

    /// Newest version of `key` visible at `sequence`.
    pub fn get(&self, key: &[u8], sequence: SequenceNumber) -> Lookup<'_> {
        let Some(idx) = self.data.seek(&InternalKey::seek_key(key, sequence)) else {
            return Lookup::Missing;
        };
        let (ik, slot) = self.data.entry(idx);
        if ik.user_key != key {
            Lookup::Missing
        } else if ik.is_tombstone() {
            Lookup::Deleted
        } else {
            Lookup::Found(slot)
        }
    }

    /// First live key at or after `from` (strictly after when `inclusive` is
    /// false) as seen at `sequence`.
    pub fn next_visible(&self, from: &[u8], inclusive: bool, sequence: SequenceNumber) -> Option<(&[u8], &Slot)> {
        let mut current = if inclusive {
            self.data.seek(&InternalKey::new(from.to_vec(), MAX_SEQUENCE, ValueType::Put))
        } else {
            // Sequence 0 is never assigned, so this sorts after every version of `from`.
            self.data.seek(&InternalKey::new(from.to_vec(), 0, ValueType::Delete))
        };
        let mut settled: Option<&[u8]> = None;
        while let Some(idx) = current {
            current = self.data.next_of(idx);
            let (ik, slot) = self.data.entry(idx);
            if !inclusive && ik.user_key == from {
                continue;
            }
            if ik.sequence > sequence || settled == Some(ik.user_key.as_slice()) {
                continue;
            }
            if !ik.is_tombstone() {
                return Some((&ik.user_key, slot));
            }
            settled = Some(&ik.user_key);
        }
        None
    }

    /// Last live key strictly before `before` (or the last live key overall
    /// when `before` is `None`) as seen at `sequence`.
    pub fn prev_visible(&self, before: Option<&[u8]>, sequence: SequenceNumber) -> Option<(&[u8], &Slot)> {
        let mut current = match before {
            Some(key) => self
                .data
                .find_less_than(&InternalKey::new(key.to_vec(), MAX_SEQUENCE, ValueType::Put)),
            None => self.data.last(),
        };
        while let Some(idx) = current {
            let user_key = &self.data.entry(idx).0.user_key;
            if let Lookup::Found(slot) = self.get(user_key, sequence) {
                return Some((user_key, slot));
            }
            current = self
                .data
                .find_less_than(&InternalKey::new(user_key.clone(), MAX_SEQUENCE, ValueType::Put));
        }
        None
    }

    /// Drop versions of keys accepted by `in_range` that no reader at or
    /// above `oldest_pinned` can observe. Returns the number of entries
    /// removed.
    ///
    /// Per user key, every version newer than `oldest_pinned` survives, plus
    /// the newest version at or below it unless that version is a tombstone.
    pub fn compact<F>(&mut self, oldest_pinned: SequenceNumber, in_range: F) -> usize
    where
        F: Fn(&[u8]) -> bool,
    {
        let before = self.data.len();
        let entries = std::mem::take(&mut self.data).into_sorted_vec();
        let mut kept = SkipList::new();
        let mut floor_reached: Option<Vec<u8>> = None;
        for (ik, slot) in entries {
            if !in_range(&ik.user_key) || ik.sequence > oldest_pinned {
                kept.insert(ik, slot);
                continue;
            }
            if floor_reached.as_deref() == Some(ik.user_key.as_slice()) {
                continue;
            }
            floor_reached = Some(ik.user_key.clone());
            if !ik.is_tombstone() {
                kept.insert(ik, slot);
            }
        }
        self.data = kept;
        before - self.data.len()
    }

    /// Every version in internal-key order.
    pub fn iter(&self) -> impl Iterator<Item = (&InternalKey, &Slot)> {
        self.data.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Distinct user keys, live or not.
    pub fn distinct_keys(&self) -> usize {
        self.data
            .iter()
            .map(|(ik, _)| ik.user_key.as_slice())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Approximate memory usage in bytes.
    pub fn size(&self) -> usize {
        self.data.size_bytes()
    }

    /// Approximate bytes held by versions whose user key is in `[start, end)`.
    /// `None` as `end` means unbounded.
    pub fn approximate_size(&self, start: &[u8], end: Option<&[u8]>) -> u64 {
        let mut total = 0u64;
        let mut current = self
            .data
            .seek(&InternalKey::new(start.to_vec(), MAX_SEQUENCE, ValueType::Put));
        while let Some(idx) = current {
            let (ik, slot) = self.data.entry(idx);
            if end.is_some_and(|end| ik.user_key.as_slice() >= end) {
                break;
            }
            total += (ik.approx_size() + slot.approx_size()) as u64;
            current = self.data.next_of(idx);
        }
        total
    }
}

impl Default for MemTable {
    fn default() -> Self {
        MemTable::new()
    }
}
