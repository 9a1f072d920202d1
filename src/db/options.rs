use crate::error::{Error, Result};
use crate::wal::SyncPolicy;

const KIB: usize = 1024;
const MIB: usize = 1024 * KIB;
const GIB: usize = 1024 * MIB;

/// Configuration for [`Db::open`](crate::db::Db::open), checked by
/// [`Options::validate`] before anything touches disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Create the directory and an empty log when missing.
    pub create_if_missing: bool,
    /// Fail if the database already exists.
    pub error_if_exists: bool,
    /// Fail on any corruption instead of recovering around it, and verify
    /// checksums on every read.
    pub paranoid_checks: bool,
    /// Log size that triggers a full compaction and checkpoint.
    /// 64 KiB ..= 1 GiB.
    pub write_buffer_size: usize,
    /// Read cache budget in bytes; 0 disables the cache. At most 4 GiB.
    pub cache_capacity: usize,
    pub sync_policy: SyncPolicy,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            create_if_missing: true,
            error_if_exists: false,
            paranoid_checks: false,
            write_buffer_size: 4 * MIB,
            cache_capacity: 8 * MIB,
            sync_policy: SyncPolicy::default(),
        }
    }
}

impl Options {
    pub fn validate(&self) -> Result<()> {
        if !(64 * KIB..=GIB).contains(&self.write_buffer_size) {
            return Err(Error::InvalidArgument(format!(
                "write_buffer_size {} outside 64 KiB ..= 1 GiB",
                self.write_buffer_size
            )));
        }
        if self.cache_capacity as u64 > 4 * GIB as u64 {
            return Err(Error::InvalidArgument(format!(
                "cache_capacity {} exceeds 4 GiB",
                self.cache_capacity
            )));
        }
        match self.sync_policy {
            SyncPolicy::EveryNWrites(0) => {
                Err(Error::InvalidArgument("sync_policy EveryNWrites(0)".into()))
            }
            SyncPolicy::EveryNMillis(0) => {
                Err(Error::InvalidArgument("sync_policy EveryNMillis(0)".into()))
            }
            _ => Ok(()),
        }
    }
}
