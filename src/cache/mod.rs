//! Read cache for point lookups.
//!
//! Entries are keyed by `(user key, read sequence)`. Data visible at a given
//! sequence never changes, so entries are never invalidated by writes; they
//! only age out of the LRU or get dropped by [`ReadCache::clear`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;

use crate::types::SequenceNumber;

type CacheKey = (Vec<u8>, SequenceNumber);

/// Fixed per-entry charge on top of key and value bytes.
const ENTRY_OVERHEAD: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub len: usize,
    pub charge: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> Option<f64> {
        let total = self.hits.saturating_add(self.misses);
        if total == 0 {
            return None;
        }
        Some(self.hits as f64 / total as f64)
    }
}

struct Inner {
    lru: LruCache<CacheKey, Arc<Vec<u8>>>,
    charge: usize,
}

/// LRU bounded by total bytes. A capacity of 0 disables caching.
pub struct ReadCache {
    capacity: usize,
    inner: Mutex<Inner>,
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
}

fn charge_of(key: &[u8], value: &[u8]) -> usize {
    key.len() + value.len() + ENTRY_OVERHEAD
}

impl ReadCache {
    pub fn new(capacity_bytes: usize) -> Self {
        ReadCache {
            capacity: capacity_bytes,
            inner: Mutex::new(Inner {
                lru: LruCache::unbounded(),
                charge: 0,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &[u8], sequence: SequenceNumber) -> Option<Arc<Vec<u8>>> {
        if self.capacity == 0 {
            return None;
        }
        let value = self.inner.lock().lru.get(&(key.to_vec(), sequence)).cloned();
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    /// Insert, evicting least recently used entries until the total charge
    /// fits. Values larger than the whole cache are not admitted.
    pub fn insert(&self, key: Vec<u8>, sequence: SequenceNumber, value: Arc<Vec<u8>>) {
        let charge = charge_of(&key, &value);
        if charge > self.capacity {
            return;
        }
        let mut inner = self.inner.lock();
        if let Some(old) = inner.lru.put((key.clone(), sequence), value) {
            inner.charge -= charge_of(&key, &old);
        }
        inner.charge += charge;
        while inner.charge > self.capacity {
            match inner.lru.pop_lru() {
                Some(((k, _), v)) => inner.charge -= charge_of(&k, &v),
                None => break,
            }
        }
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let dropped = inner.lru.len();
        inner.lru.clear();
        inner.charge = 0;
        dropped
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            len: inner.lru.len(),
            charge: inner.charge,
        }
    }
}

impl std::fmt::Debug for ReadCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadCache")
            .field("capacity", &self.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}
