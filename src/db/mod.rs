//! The bundled storage engine.
//!
//! Every write batch is appended to a log as one record and applied to a
//! multi-version memtable. Snapshots pin a sequence number; reads at a
//! snapshot see exactly the versions written at or before it. Compaction
//! drops versions no live snapshot can observe and rewrites the log from
//! what remains.

pub mod iterator;
pub mod options;
pub mod snapshot;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

pub use options::Options;
pub use snapshot::{DbSnapshot, SnapshotTracker};

use crate::batch::{Edit, WriteBatch};
use crate::cache::{CacheStats, ReadCache};
use crate::engine::{ReadHandle, ReadOptions, StorageEngine, WriteOptions};
use crate::error::{Error, Result};
use crate::interval::Interval;
use crate::memtable::{Lookup, MemTable};
use crate::types::SequenceNumber;
use crate::wal::writer::truncate;
use crate::wal::{BatchRecord, CHECKPOINT_FILE, LOG_FILE, LogEdit, SyncPolicy, WALManager, WALReader};

const PROPERTY_PREFIX: &str = "rangekv.";

/// Point-in-time engine counters.
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    /// Stored versions, tombstones included.
    pub entries: usize,
    pub distinct_keys: usize,
    pub last_sequence: SequenceNumber,
    pub live_snapshots: usize,
    pub batches_written: u64,
    pub point_reads: u64,
    pub compactions: u64,
    /// Live log size; 0 for in-memory databases.
    pub log_bytes: u64,
    pub memtable_bytes: usize,
    pub cache: CacheStats,
}

pub(crate) struct DbInner {
    path: Option<PathBuf>,
    pub(crate) options: Options,
    pub(crate) mem: RwLock<MemTable>,
    wal: Mutex<Option<WALManager>>,
    last_sequence: AtomicU64,
    pub(crate) snapshots: SnapshotTracker,
    cache: ReadCache,
    batches_written: AtomicU64,
    point_reads: AtomicU64,
    compactions: AtomicU64,
}

impl DbInner {
    fn new(path: Option<PathBuf>, options: Options, mem: MemTable, last_sequence: SequenceNumber) -> Self {
        let cache = ReadCache::new(options.cache_capacity);
        DbInner {
            path,
            options,
            mem: RwLock::new(mem),
            wal: Mutex::new(None),
            last_sequence: AtomicU64::new(last_sequence),
            snapshots: SnapshotTracker::new(),
            cache,
            batches_written: AtomicU64::new(0),
            point_reads: AtomicU64::new(0),
            compactions: AtomicU64::new(0),
        }
    }

    pub(crate) fn latest_sequence(&self) -> SequenceNumber {
        self.last_sequence.load(Ordering::Acquire)
    }

    pub(crate) fn get_at(&self, key: &[u8], sequence: SequenceNumber, options: ReadOptions) -> Result<Option<Vec<u8>>> {
        self.point_reads.fetch_add(1, Ordering::Relaxed);
        // Cached values were not necessarily checksummed.
        let verify = options.verify_checksums || self.options.paranoid_checks;
        if !verify {
            if let Some(cached) = self.cache.get(key, sequence) {
                return Ok(Some(cached.as_ref().clone()));
            }
        }

        let value = {
            let mem = self.mem.read();
            match mem.get(key, sequence) {
                Lookup::Found(slot) => {
                    if verify && !slot.verify() {
                        warn!(key = %key.escape_ascii(), sequence, "value checksum mismatch");
                        return Err(Error::Corruption(format!(
                            "checksum mismatch for key {}",
                            key.escape_ascii()
                        )));
                    }
                    slot.value.clone()
                }
                Lookup::Deleted | Lookup::Missing => return Ok(None),
            }
        };

        if options.fill_cache {
            self.cache.insert(key.to_vec(), sequence, Arc::new(value.clone()));
        }
        Ok(Some(value))
    }

    fn write(&self, batch: &WriteBatch, options: WriteOptions) -> Result<()> {
        let edits = batch.edits();
        if edits.is_empty() {
            return Ok(());
        }

        let mut wal = self.wal.lock();
        let mut record = BatchRecord::new(self.latest_sequence() + 1);
        for edit in edits {
            match edit {
                Edit::Put { key, value } => record.put(key, value),
                Edit::Delete { key } => record.delete(key),
            }
        }
        if let Some(wal) = wal.as_mut() {
            wal.append(&record, options.sync)?;
        }

        {
            let mut mem = self.mem.write();
            apply(&mut mem, &record);
            self.last_sequence.store(record.last_sequence(), Ordering::Release);
        }
        self.batches_written.fetch_add(1, Ordering::Relaxed);

        let log_full = wal
            .as_ref()
            .is_some_and(|w| w.bytes_since_checkpoint() > self.options.write_buffer_size as u64);
        if log_full {
            debug!(limit = self.options.write_buffer_size, "log grew past write buffer size");
            // The batch is already durable and visible. A failed checkpoint
            // leaves the old log in place and is retried on the next write.
            if let Err(e) = self.compact_locked(&mut wal, &Interval::everything()) {
                warn!(error = %e, sequence = record.last_sequence(), "automatic checkpoint failed");
            }
        }
        Ok(())
    }

    /// Compaction body. The caller holds the log lock, so no write can
    /// interleave.
    fn compact_locked(&self, wal: &mut Option<WALManager>, interval: &Interval) -> Result<()> {
        let oldest = self.snapshots.oldest(|| self.latest_sequence());
        let dropped = self
            .mem
            .write()
            .compact(oldest, |key| interval.contains_bytes(key));
        self.compactions.fetch_add(1, Ordering::Relaxed);
        debug!(%interval, oldest, dropped, "compacted");

        if let Some(wal) = wal.as_mut() {
            let records = checkpoint_records(&self.mem.read(), self.latest_sequence());
            wal.checkpoint(records)?;
        }
        Ok(())
    }

    fn stats(&self) -> Stats {
        // Log before memtable: writers take the locks in that order.
        let log_bytes = self.wal.lock().as_ref().map_or(0, WALManager::size);
        let mem = self.mem.read();
        Stats {
            entries: mem.len(),
            distinct_keys: mem.distinct_keys(),
            last_sequence: self.latest_sequence(),
            live_snapshots: self.snapshots.count(),
            batches_written: self.batches_written.load(Ordering::Relaxed),
            point_reads: self.point_reads.load(Ordering::Relaxed),
            compactions: self.compactions.load(Ordering::Relaxed),
            log_bytes,
            memtable_bytes: mem.size(),
            cache: self.cache.stats(),
        }
    }
}

fn apply(mem: &mut MemTable, record: &BatchRecord) {
    for (i, edit) in record.edits.iter().enumerate() {
        mem.add(
            record.sequence + i as u64,
            edit.value_type,
            edit.key.clone(),
            edit.value.clone(),
        );
    }
}

/// One single-edit record per stored version, then an empty record that
/// carries the last sequence number forward.
fn checkpoint_records(mem: &MemTable, last_sequence: SequenceNumber) -> Vec<BatchRecord> {
    let mut records: Vec<BatchRecord> = mem
        .iter()
        .map(|(ik, slot)| BatchRecord {
            sequence: ik.sequence,
            edits: vec![LogEdit {
                value_type: ik.value_type,
                key: ik.user_key.clone(),
                value: slot.value.clone(),
            }],
        })
        .collect();
    records.push(BatchRecord::new(last_sequence + 1));
    records
}

/// Replay the log at `path`. Returns the rebuilt memtable, the last
/// sequence number and the number of batches applied.
fn recover(path: &Path, paranoid: bool) -> Result<(MemTable, SequenceNumber, usize)> {
    let mut mem = MemTable::new();
    let mut last_sequence = 0;
    let mut batches = 0;
    if !path.exists() {
        return Ok((mem, last_sequence, batches));
    }

    let reader = WALReader::new(path)?;
    let mut records = reader.iter();
    let mut torn = None;
    for record in records.by_ref() {
        match record {
            Ok(record) => {
                apply(&mut mem, &record);
                last_sequence = last_sequence.max(record.last_sequence());
                batches += 1;
            }
            Err(e) if paranoid => return Err(e),
            Err(e) => torn = Some(e),
        }
    }

    if let Some(e) = torn {
        let valid = records.offset();
        warn!(
            path = %path.display(),
            error = %e,
            kept_bytes = valid,
            dropped_bytes = reader.len() - valid,
            "truncating corrupt log tail"
        );
        truncate(path, valid as u64)?;
    }
    Ok((mem, last_sequence, batches))
}

/// An embedded ordered key-value store with snapshot reads.
///
/// Cloning is cheap and every clone refers to the same database. The log is
/// closed when the last clone and the last snapshot are dropped.
#[derive(Clone)]
pub struct Db {
    inner: Arc<DbInner>,
}

impl Db {
    /// Open (or create) the database in directory `path`.
    pub fn open(path: impl AsRef<Path>, options: Options) -> Result<Db> {
        options.validate()?;
        let dir = path.as_ref();
        let log = dir.join(LOG_FILE);

        if log.exists() {
            if options.error_if_exists {
                return Err(Error::InvalidArgument(format!(
                    "{} exists (error_if_exists is true)",
                    dir.display()
                )));
            }
        } else if options.create_if_missing {
            fs::create_dir_all(dir)?;
        } else {
            return Err(Error::InvalidArgument(format!(
                "{} does not exist (create_if_missing is false)",
                dir.display()
            )));
        }

        let (mem, last_sequence, batches) = recover(&log, options.paranoid_checks)?;
        let wal = WALManager::open(dir, options.sync_policy.clone())?;
        info!(
            path = %dir.display(),
            batches,
            last_sequence,
            entries = mem.len(),
            "database opened"
        );

        let inner = DbInner::new(Some(dir.to_path_buf()), options, mem, last_sequence);
        *inner.wal.lock() = Some(wal);
        Ok(Db {
            inner: Arc::new(inner),
        })
    }

    /// A database that lives only in memory. Nothing is persisted.
    pub fn open_in_memory(options: Options) -> Result<Db> {
        options.validate()?;
        Ok(Db {
            inner: Arc::new(DbInner::new(None, options, MemTable::new(), 0)),
        })
    }

    /// Remove the database at `path`. The directory itself is removed if
    /// nothing else is left in it.
    pub fn destroy(path: impl AsRef<Path>) -> Result<()> {
        let dir = path.as_ref();
        if !dir.exists() {
            return Ok(());
        }
        for name in [LOG_FILE, CHECKPOINT_FILE] {
            let file = dir.join(name);
            if file.exists() {
                fs::remove_file(&file)?;
            }
        }
        if fs::read_dir(dir)?.next().is_none() {
            fs::remove_dir(dir)?;
        }
        info!(path = %dir.display(), "database destroyed");
        Ok(())
    }

    /// Rebuild the log at `path` from every intact batch before the first
    /// corrupt one. Returns the number of batches kept.
    pub fn repair(path: impl AsRef<Path>) -> Result<usize> {
        let dir = path.as_ref();
        let log = dir.join(LOG_FILE);
        if !log.exists() {
            return Err(Error::InvalidArgument(format!("no database at {}", dir.display())));
        }

        let reader = WALReader::new(&log)?;
        let mut kept = Vec::new();
        for record in reader.iter() {
            match record {
                Ok(record) => kept.push(record),
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "repair dropping corrupt tail");
                }
            }
        }

        let count = kept.len();
        WALManager::open(dir, SyncPolicy::EveryWrite)?.checkpoint(kept)?;
        info!(path = %dir.display(), batches = count, "database repaired");
        Ok(count)
    }

    /// Directory of a disk-backed database.
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    pub fn options(&self) -> &Options {
        &self.inner.options
    }

    /// Value of `key` in the current state.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        DbSnapshot::new(Arc::clone(&self.inner)).get(key, ReadOptions::default())
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let batch = WriteBatch::new();
        batch.put(key, value);
        self.inner.write(&batch, WriteOptions::default())
    }

    pub fn delete(&self, key: &[u8]) -> Result<()> {
        let batch = WriteBatch::new();
        batch.remove(key);
        self.inner.write(&batch, WriteOptions::default())
    }

    /// Force the log to disk.
    pub fn sync(&self) -> Result<()> {
        match self.inner.wal.lock().as_mut() {
            Some(wal) => wal.sync(),
            None => Ok(()),
        }
    }

    pub fn stats(&self) -> Stats {
        self.inner.stats()
    }

    fn format_stats(&self) -> String {
        let s = self.stats();
        let hit_rate = s
            .cache
            .hit_rate()
            .map_or_else(|| "n/a".to_string(), |r| format!("{:.1}%", r * 100.0));
        format!(
            "entries: {}\n\
             distinct keys: {}\n\
             last sequence: {}\n\
             live snapshots: {}\n\
             batches written: {}\n\
             point reads: {}\n\
             compactions: {}\n\
             log bytes: {}\n\
             memtable bytes: {}\n\
             cache: {} entries, {} bytes, hit rate {}\n",
            s.entries,
            s.distinct_keys,
            s.last_sequence,
            s.live_snapshots,
            s.batches_written,
            s.point_reads,
            s.compactions,
            s.log_bytes,
            s.memtable_bytes,
            s.cache.len,
            s.cache.charge,
            hit_rate,
        )
    }

    /// Files at a level: the log is the only level-0 file.
    fn files_at_level(&self, level: u32) -> usize {
        usize::from(level == 0 && self.inner.path.is_some())
    }
}

impl StorageEngine for Db {
    fn take_snapshot(&self) -> Arc<dyn ReadHandle> {
        Arc::new(DbSnapshot::new(Arc::clone(&self.inner)))
    }

    fn write(&self, batch: &WriteBatch, options: WriteOptions) -> Result<()> {
        self.inner.write(batch, options)
    }

    fn property(&self, name: &str) -> Option<String> {
        let name = name.strip_prefix(PROPERTY_PREFIX)?;
        if let Some(level) = name.strip_prefix("num-files-at-level") {
            let level: u32 = level.parse().ok()?;
            return Some(self.files_at_level(level).to_string());
        }
        match name {
            "stats" => Some(self.format_stats()),
            "sstables" => {
                let mut out = String::from("--- level 0 ---\n");
                if self.inner.path.is_some() {
                    out.push_str(&format!("{}: {} bytes\n", LOG_FILE, self.stats().log_bytes));
                }
                Some(out)
            }
            "approximate-memory-usage" => {
                let bytes = self.inner.mem.read().size() + self.inner.cache.stats().charge;
                Some(bytes.to_string())
            }
            _ => None,
        }
    }

    fn approximate_sizes(&self, intervals: &[Interval]) -> Vec<u64> {
        let mem = self.inner.mem.read();
        intervals
            .iter()
            .map(|interval| match interval.start().as_bytes() {
                Some(start) => mem.approximate_size(start, interval.end().as_bytes()),
                None => 0,
            })
            .collect()
    }

    fn compact(&self, interval: &Interval) -> Result<()> {
        let mut wal = self.inner.wal.lock();
        self.inner.compact_locked(&mut wal, interval)
    }

    fn prune_cache(&self) {
        let dropped = self.inner.cache.clear();
        debug!(dropped, "read cache pruned");
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("path", &self.inner.path)
            .field("last_sequence", &self.inner.latest_sequence())
            .finish()
    }
}
