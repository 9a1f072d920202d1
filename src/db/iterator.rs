use std::sync::Arc;

use tracing::warn;

use crate::db::snapshot::PinnedSequence;
use crate::error::{Error, Result};
use crate::iterator::StorageIterator;
use crate::memtable::Slot;

/// Iterator over the live keys of a [`Db`](crate::db::Db) at a pinned
/// sequence.
///
/// Holds a copy of the current pair and takes the memtable read lock only
/// for the duration of each move, so a long-lived iterator never blocks
/// writers. Every move re-searches from the current key, which keeps the
/// iterator correct across concurrent inserts and compactions.
pub struct DbIterator {
    pin: Arc<PinnedSequence>,
    verify: bool,
    current: Option<(Vec<u8>, Vec<u8>)>,
}

impl DbIterator {
    pub(crate) fn new(pin: Arc<PinnedSequence>, verify: bool) -> Self {
        DbIterator {
            pin,
            verify,
            current: None,
        }
    }
}

fn capture(found: Option<(&[u8], &Slot)>, verify: bool) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
    let Some((key, slot)) = found else {
        return Ok(None);
    };
    if verify && !slot.verify() {
        warn!(key = %key.escape_ascii(), "value checksum mismatch");
        return Err(Error::Corruption(format!(
            "checksum mismatch for key {}",
            key.escape_ascii()
        )));
    }
    Ok(Some((key.to_vec(), slot.value.clone())))
}

impl StorageIterator for DbIterator {
    fn key(&self) -> &[u8] {
        self.current.as_ref().map(|(k, _)| k.as_slice()).unwrap_or_default()
    }

    fn value(&self) -> &[u8] {
        self.current.as_ref().map(|(_, v)| v.as_slice()).unwrap_or_default()
    }

    fn is_valid(&self) -> bool {
        self.current.is_some()
    }

    fn next(&mut self) -> Result<()> {
        let Some((key, _)) = self.current.take() else {
            return Ok(());
        };
        let mem = self.pin.inner.mem.read();
        self.current = capture(mem.next_visible(&key, false, self.pin.sequence), self.verify)?;
        Ok(())
    }

    fn prev(&mut self) -> Result<()> {
        let Some((key, _)) = self.current.take() else {
            return Ok(());
        };
        let mem = self.pin.inner.mem.read();
        self.current = capture(mem.prev_visible(Some(&key), self.pin.sequence), self.verify)?;
        Ok(())
    }

    fn seek(&mut self, target: &[u8]) -> Result<()> {
        self.current = None;
        let mem = self.pin.inner.mem.read();
        self.current = capture(mem.next_visible(target, true, self.pin.sequence), self.verify)?;
        Ok(())
    }

    fn seek_to_first(&mut self) -> Result<()> {
        self.seek(&[])
    }

    fn seek_to_last(&mut self) -> Result<()> {
        self.current = None;
        let mem = self.pin.inner.mem.read();
        self.current = capture(mem.prev_visible(None, self.pin.sequence), self.verify)?;
        Ok(())
    }
}
