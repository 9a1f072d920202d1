use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::db::DbInner;
use crate::db::iterator::DbIterator;
use crate::engine::{ReadHandle, ReadOptions};
use crate::error::Result;
use crate::iterator::StorageIterator;
use crate::types::SequenceNumber;

/// Tracks pinned sequence numbers and the oldest one still in use.
///
/// Several snapshots may pin the same sequence, so each entry is a count.
#[derive(Debug, Default)]
pub struct SnapshotTracker {
    pinned: Mutex<BTreeMap<SequenceNumber, usize>>,
}

impl SnapshotTracker {
    pub fn new() -> Self {
        SnapshotTracker::default()
    }

    /// Pin the sequence returned by `latest`, read while holding the
    /// tracker lock so a concurrent [`SnapshotTracker::oldest`] either sees
    /// the pin or computed its floor from an older latest sequence.
    pub fn pin(&self, latest: impl FnOnce() -> SequenceNumber) -> SequenceNumber {
        let mut pinned = self.pinned.lock();
        let sequence = latest();
        *pinned.entry(sequence).or_insert(0) += 1;
        sequence
    }

    pub fn release(&self, sequence: SequenceNumber) {
        let mut pinned = self.pinned.lock();
        if let Some(count) = pinned.get_mut(&sequence) {
            *count -= 1;
            if *count == 0 {
                pinned.remove(&sequence);
            }
        }
    }

    /// Oldest pinned sequence, or `latest()` when nothing is pinned.
    pub fn oldest(&self, latest: impl FnOnce() -> SequenceNumber) -> SequenceNumber {
        let pinned = self.pinned.lock();
        let latest = latest();
        pinned.keys().next().copied().map_or(latest, |s| s.min(latest))
    }

    /// Number of live pins.
    pub fn count(&self) -> usize {
        self.pinned.lock().values().sum()
    }
}

/// Keeps a sequence pinned for as long as any handle or iterator uses it.
pub(crate) struct PinnedSequence {
    pub(crate) inner: Arc<DbInner>,
    pub(crate) sequence: SequenceNumber,
}

impl Drop for PinnedSequence {
    fn drop(&mut self) {
        self.inner.snapshots.release(self.sequence);
    }
}

/// Point-in-time handle onto a [`Db`](crate::db::Db).
pub struct DbSnapshot {
    pin: Arc<PinnedSequence>,
}

impl DbSnapshot {
    pub(crate) fn new(inner: Arc<DbInner>) -> Self {
        let sequence = inner.snapshots.pin(|| inner.latest_sequence());
        DbSnapshot {
            pin: Arc::new(PinnedSequence { inner, sequence }),
        }
    }
}

impl ReadHandle for DbSnapshot {
    fn get(&self, key: &[u8], options: ReadOptions) -> Result<Option<Vec<u8>>> {
        self.pin.inner.get_at(key, self.pin.sequence, options)
    }

    fn new_iterator(&self, options: ReadOptions) -> Result<Box<dyn StorageIterator + Send>> {
        let verify = options.verify_checksums || self.pin.inner.options.paranoid_checks;
        Ok(Box::new(DbIterator::new(Arc::clone(&self.pin), verify)))
    }

    fn sequence(&self) -> SequenceNumber {
        self.pin.sequence
    }
}
