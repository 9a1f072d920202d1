use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::wal::SyncPolicy;
use crate::wal::record::BatchRecord;

/// Name of the live log inside a database directory.
pub const LOG_FILE: &str = "data.wal";
/// Scratch file a checkpoint is written to before it replaces the log.
pub const CHECKPOINT_FILE: &str = "data.wal.tmp";

/// Appends batch records to a log file.
///
/// Two layers of buffering:
///   BufWriter.flush()  → Rust buffer → OS page cache
///   file.sync_all()    → OS page cache → physical disk
///
/// Every append reaches the page cache before it returns; the sync policy
/// decides when it also reaches the disk.
///
/// Records are written at `offset`, the end of the last good record, not
/// at the end of the file. A failed append is cut back off the file, so
/// later records never land behind a torn one. If the cut fails, or an
/// fsync fails, the writer refuses every later append.
pub struct WALWriter {
    writer: BufWriter<File>,
    offset: u64,
    sync_policy: SyncPolicy,
    writes_since_sync: usize,
    last_sync: Instant,
    failed: Option<String>,
}

impl WALWriter {
    /// Open `path` for writing after its last byte, creating it if needed.
    pub fn new(path: &Path, sync_policy: SyncPolicy) -> Result<Self> {
        let mut file = OpenOptions::new().create(true).write(true).open(path)?;
        let offset = file.seek(SeekFrom::End(0))?;
        Ok(WALWriter::positioned(file, offset, sync_policy))
    }

    /// Wrap a file whose cursor already sits at `offset`.
    fn positioned(file: File, offset: u64, sync_policy: SyncPolicy) -> Self {
        WALWriter {
            writer: BufWriter::new(file),
            offset,
            sync_policy,
            writes_since_sync: 0,
            last_sync: Instant::now(),
            failed: None,
        }
    }

    /// Append a record. Syncs when `force_sync` is set or the policy is due.
    ///
    /// On error nothing of the record stays in the log.
    pub fn append(&mut self, record: &BatchRecord, force_sync: bool) -> Result<()> {
        if let Some(cause) = &self.failed {
            return Err(Error::Other(format!("log is read-only after a failed write: {}", cause)));
        }

        let encoded = record.encode();
        let start = self.offset;
        if let Err(e) = self.write_record(&encoded, force_sync) {
            self.discard_from(start, &e);
            return Err(e);
        }
        Ok(())
    }

    fn write_record(&mut self, encoded: &[u8], force_sync: bool) -> Result<()> {
        self.writer.write_all(encoded)?;
        self.writer.flush()?;

        let pending = self.writes_since_sync + 1;
        let due = match self.sync_policy {
            SyncPolicy::EveryWrite => true,
            SyncPolicy::EveryNWrites(n) => pending >= n,
            SyncPolicy::EveryNMillis(ms) => self.last_sync.elapsed() >= Duration::from_millis(ms),
        };
        if force_sync || due {
            if let Err(e) = self.writer.get_ref().sync_all() {
                // Earlier unsynced appends may be gone from the page cache.
                self.failed = Some(e.to_string());
                return Err(e.into());
            }
            self.writes_since_sync = 0;
            self.last_sync = Instant::now();
        } else {
            self.writes_since_sync = pending;
        }

        self.offset += encoded.len() as u64;
        Ok(())
    }

    /// Cut the file back to `len` after a failed append and drop whatever
    /// the failed write left in the buffer.
    fn discard_from(&mut self, len: u64, cause: &Error) {
        match self.reset_tail(len) {
            Ok(()) => warn!(offset = len, error = %cause, "log append failed, partial record removed"),
            Err(e) => {
                warn!(
                    offset = len,
                    error = %cause,
                    rollback_error = %e,
                    "log append failed and could not be rolled back, refusing further writes"
                );
                if self.failed.is_none() {
                    self.failed = Some(cause.to_string());
                }
            }
        }
    }

    fn reset_tail(&mut self, len: u64) -> Result<()> {
        let file = self.writer.get_ref().try_clone()?;
        let stale = std::mem::replace(&mut self.writer, BufWriter::new(file));
        // into_parts hands back unwritten bytes instead of flushing them.
        let (_file, _unwritten) = stale.into_parts();

        let file = self.writer.get_mut();
        file.set_len(len)?;
        file.seek(SeekFrom::Start(len))?;
        Ok(())
    }

    /// Force fsync to disk. Ensures all buffered writes are durable.
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.writes_since_sync = 0;
        self.last_sync = Instant::now();
        Ok(())
    }

    /// End of the last good record, in bytes.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Appends not yet covered by an fsync.
    pub fn writes_since_sync(&self) -> usize {
        self.writes_since_sync
    }

    /// Whether an unrecoverable failure has made the log read-only.
    pub fn is_failed(&self) -> bool {
        self.failed.is_some()
    }
}

/// Owns the live log of a database directory and replaces it on checkpoint.
///
/// A checkpoint writes the full current state to a temporary file, fsyncs
/// it, and renames it over the live log. The old log stays intact until the
/// rename, so a crash at any point leaves one complete log on disk.
pub struct WALManager {
    dir: PathBuf,
    sync_policy: SyncPolicy,
    active: WALWriter,
    /// Log size right after the last checkpoint.
    checkpoint_size: u64,
}

impl WALManager {
    pub fn open(dir: &Path, sync_policy: SyncPolicy) -> Result<Self> {
        let active = WALWriter::new(&dir.join(LOG_FILE), sync_policy.clone())?;
        Ok(WALManager {
            dir: dir.to_path_buf(),
            sync_policy,
            active,
            checkpoint_size: 0,
        })
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE)
    }

    pub fn append(&mut self, record: &BatchRecord, force_sync: bool) -> Result<()> {
        self.active.append(record, force_sync)
    }

    pub fn sync(&mut self) -> Result<()> {
        self.active.sync()
    }

    /// Size of the live log in bytes.
    pub fn size(&self) -> u64 {
        self.active.offset()
    }

    /// Bytes appended since the last checkpoint. Before the first one this
    /// is the whole log, so a large recovered log is compacted on the next
    /// write.
    pub fn bytes_since_checkpoint(&self) -> u64 {
        self.active.offset().saturating_sub(self.checkpoint_size)
    }

    /// Atomically replace the live log with `records`.
    ///
    /// Also clears a failed writer: the new log is written from scratch.
    pub fn checkpoint<I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = BatchRecord>,
    {
        let tmp = self.dir.join(CHECKPOINT_FILE);
        if tmp.exists() {
            fs::remove_file(&tmp)?;
        }

        let mut writer = BufWriter::new(File::create(&tmp)?);
        let mut written = 0u64;
        let mut count = 0usize;
        for record in records {
            let encoded = record.encode();
            writer.write_all(&encoded)?;
            written += encoded.len() as u64;
            count += 1;
        }
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;

        let live = self.log_path();
        fs::rename(&tmp, &live)?;
        // From here the renamed file is the log; keep writing through the
        // same handle so no later failure leaves appends going to the old one.
        let old_size = self.active.offset();
        self.active = WALWriter::positioned(file, written, self.sync_policy.clone());
        self.checkpoint_size = written;
        sync_dir(&self.dir)?;

        debug!(records = count, old_bytes = old_size, new_bytes = written, "log checkpointed");
        Ok(())
    }
}

/// Cut `path` back to its first `len` bytes.
pub fn truncate(path: &Path, len: u64) -> Result<()> {
    let file = OpenOptions::new().write(true).open(path)?;
    file.set_len(len)?;
    file.sync_all()?;
    debug!(path = %path.display(), len, "log truncated");
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sequence: u64) -> BatchRecord {
        let mut record = BatchRecord::new(sequence);
        record.put(b"k".to_vec(), b"v".to_vec());
        record
    }

    #[test]
    fn unrecoverable_append_failure_is_sticky() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOG_FILE);
        {
            let mut writer = WALWriter::new(&path, SyncPolicy::EveryWrite).unwrap();
            writer.append(&record(1), false).unwrap();
        }
        let len = fs::metadata(&path).unwrap().len();

        // A read-only handle fails both the write and the rollback.
        let file = File::open(&path).unwrap();
        let mut writer = WALWriter::positioned(file, len, SyncPolicy::EveryWrite);
        assert!(writer.append(&record(2), false).is_err());
        assert!(writer.is_failed());

        let err = writer.append(&record(3), false).unwrap_err();
        assert_eq!(err.code(), -1);
        assert_eq!(writer.offset(), len);
        assert_eq!(fs::metadata(&path).unwrap().len(), len);
    }

    #[test]
    fn appends_overwrite_bytes_past_the_last_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOG_FILE);
        let mut writer = WALWriter::new(&path, SyncPolicy::EveryWrite).unwrap();
        writer.append(&record(1), false).unwrap();
        let good = writer.offset();

        let mut tail = OpenOptions::new().append(true).open(&path).unwrap();
        tail.write_all(&[0xAB; 5]).unwrap();

        writer.append(&record(2), false).unwrap();
        assert_eq!(writer.offset(), good * 2);
        assert_eq!(fs::metadata(&path).unwrap().len(), good * 2);
    }
}
