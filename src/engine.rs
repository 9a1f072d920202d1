//! The seam between the view layer and a storage engine.
//!
//! Snapshots, cursors and write batches only talk to an engine through the
//! traits here. The bundled [`Db`](crate::db::Db) implements them; any other
//! ordered store with point-in-time reads can too.

use std::sync::Arc;

use crate::batch::WriteBatch;
use crate::error::Result;
use crate::interval::Interval;
use crate::iterator::StorageIterator;
use crate::snapshot::Snapshot;
use crate::types::SequenceNumber;

/// Options for reads through a [`ReadHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Verify stored checksums of every value read.
    pub verify_checksums: bool,
    /// Let values read populate the engine's cache.
    pub fill_cache: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            verify_checksums: false,
            fill_cache: true,
        }
    }
}

/// Options for [`StorageEngine::write`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Make the write durable before returning.
    pub sync: bool,
}

/// An immutable point-in-time view of an engine.
///
/// Reads through one handle are mutually consistent and never observe
/// writes made after the handle was taken. The engine releases the handle's
/// resources when the last clone of its `Arc` is dropped.
pub trait ReadHandle: Send + Sync {
    /// Value stored under the full (engine-space) `key`, if live.
    fn get(&self, key: &[u8], options: ReadOptions) -> Result<Option<Vec<u8>>>;

    /// A fresh, unpositioned iterator over the whole key space.
    fn new_iterator(&self, options: ReadOptions) -> Result<Box<dyn StorageIterator + Send>>;

    /// The engine sequence number this view pins.
    fn sequence(&self) -> SequenceNumber;
}

/// An ordered key-value store the view layer can sit on.
pub trait StorageEngine {
    /// Pin the current state.
    fn take_snapshot(&self) -> Arc<dyn ReadHandle>;

    /// Apply every edit in `batch` atomically.
    fn write(&self, batch: &WriteBatch, options: WriteOptions) -> Result<()>;

    /// Engine diagnostics by name, `None` for unknown properties.
    fn property(&self, name: &str) -> Option<String>;

    /// Approximate stored bytes for each engine-space interval.
    fn approximate_sizes(&self, intervals: &[Interval]) -> Vec<u64>;

    /// Compact the stored data whose keys fall in `interval`.
    fn compact(&self, interval: &Interval) -> Result<()>;

    /// Drop cached values.
    fn prune_cache(&self);

    /// A [`Snapshot`] over the whole engine as of now.
    fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.take_snapshot())
    }
}
