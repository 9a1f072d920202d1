pub mod reader;
pub mod record;
pub mod writer;

pub use reader::{WALIterator, WALReader};
pub use record::{BatchRecord, LogEdit};
pub use writer::{CHECKPOINT_FILE, LOG_FILE, WALManager, WALWriter};

/// Controls when the log is fsync'd to disk.
///
/// Trade-off: durability vs throughput.
///   - EveryWrite: zero data loss, ~10x slower (each fsync waits for disk)
///   - EveryNWrites: batched durability, lose up to N writes on crash
///   - EveryNMillis: bounded loss window, checked on each append
///
/// A write issued with `WriteOptions { sync: true }` is synced regardless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPolicy {
    /// fsync after every record. Safest, slowest.
    EveryWrite,
    /// fsync every N records. Batched durability.
    EveryNWrites(usize),
    /// fsync on the first append at least N ms after the previous sync.
    EveryNMillis(u64),
}

impl Default for SyncPolicy {
    fn default() -> Self {
        SyncPolicy::EveryNWrites(64)
    }
}
