use std::fmt;

use crate::error::{Error, Result};
use crate::interval::Interval;
use crate::iterator::StorageIterator;
use crate::key::{self, Key};
use crate::snapshot::Snapshot;

/// A positioned walk over one [`Snapshot`].
///
/// A cursor is either *valid*, holding the current pair with the view's
/// prefix stripped, or *invalid*. Stepping past either end of the view makes
/// it invalid, and stepping an invalid cursor does nothing; only an explicit
/// seek can make it valid again.
///
/// The cursor owns one engine iterator for its whole life and is not `Sync`.
/// Its snapshot keeps the engine state pinned until the cursor is dropped.
pub struct Cursor {
    snapshot: Snapshot,
    iter: Box<dyn StorageIterator + Send>,
    /// Visible range in engine key space.
    bounds: Interval,
    current: Option<(Vec<u8>, Vec<u8>)>,
    /// Error raised while `Iterator::next` was stepping, reported on the
    /// following call.
    deferred: Option<Error>,
}

impl Cursor {
    /// A cursor at the first pair in view order (the last key when the view
    /// is reversed), or invalid when the view is empty.
    pub fn new(snapshot: Snapshot) -> Result<Self> {
        let mut cursor = Cursor::unpositioned(snapshot)?;
        if cursor.snapshot.is_reversed() {
            cursor.seek_to_last_in_bounds()?;
        } else {
            cursor.seek_to_first_in_bounds()?;
        }
        Ok(cursor)
    }

    pub(crate) fn unpositioned(snapshot: Snapshot) -> Result<Self> {
        let iter = snapshot.handle().new_iterator(snapshot.read_options())?;
        let bounds = snapshot.stored_interval();
        Ok(Cursor {
            snapshot,
            iter,
            bounds,
            current: None,
            deferred: None,
        })
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn is_valid(&self) -> bool {
        self.current.is_some()
    }

    /// Current key with the prefix stripped.
    pub fn key(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|(k, _)| k.as_slice())
    }

    pub fn value(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|(_, v)| v.as_slice())
    }

    /// Move one pair forward in view order.
    pub fn step(&mut self) -> Result<()> {
        if self.current.is_none() {
            return Ok(());
        }
        let moved = if self.snapshot.is_reversed() {
            self.iter.prev()
        } else {
            self.iter.next()
        };
        self.settle(moved.map(|()| true))
    }

    /// Move one pair backward in view order.
    pub fn prev(&mut self) -> Result<()> {
        if self.current.is_none() {
            return Ok(());
        }
        let moved = if self.snapshot.is_reversed() {
            self.iter.next()
        } else {
            self.iter.prev()
        };
        self.settle(moved.map(|()| true))
    }

    /// Position at `key` or the nearest pair after it in view order: the
    /// least key `>= key`, or the greatest key `<= key` when reversed.
    pub fn seek(&mut self, key: impl Into<Key>) -> Result<()> {
        let key = key.into();
        let prefix = self.snapshot.prefix();
        if self.snapshot.is_reversed() {
            if key >= *self.snapshot.interval().end() {
                self.seek_to_last_in_bounds()
            } else {
                let target = key.prefixed_by(prefix);
                self.seek_at_or_before(&target)
            }
        } else {
            let target = key::max(self.snapshot.interval().start(), &key).prefixed_by(prefix);
            self.seek_at_or_after(&target)
        }
    }

    /// Position at the first pair in view order.
    pub fn seek_to_first(&mut self) -> Result<()> {
        if self.snapshot.is_reversed() {
            self.seek_to_last_in_bounds()
        } else {
            self.seek_to_first_in_bounds()
        }
    }

    /// Position at the last pair in view order.
    pub fn seek_to_last(&mut self) -> Result<()> {
        if self.snapshot.is_reversed() {
            self.seek_to_first_in_bounds()
        } else {
            self.seek_to_last_in_bounds()
        }
    }

    /// Least stored key in the view, ignoring direction.
    pub(crate) fn seek_to_first_in_bounds(&mut self) -> Result<()> {
        let start = self.bounds.start().clone();
        self.seek_at_or_after(&start)
    }

    /// Greatest stored key in the view, ignoring direction.
    pub(crate) fn seek_to_last_in_bounds(&mut self) -> Result<()> {
        let moved = match self.bounds.end().clone() {
            Key::Infinity => self.iter.seek_to_last(),
            Key::Bytes(end) => self.iter.seek(&end).and_then(|()| {
                if self.iter.is_valid() {
                    self.iter.prev()
                } else {
                    self.iter.seek_to_last()
                }
            }),
        };
        self.settle(moved.map(|()| true))
    }

    /// Least stored key `>= target` (engine space).
    pub(crate) fn seek_at_or_after(&mut self, target: &Key) -> Result<()> {
        let moved = match target {
            Key::Infinity => Ok(false),
            Key::Bytes(target) => self.iter.seek(target).map(|()| true),
        };
        self.settle(moved)
    }

    /// Greatest stored key `<= target` (engine space).
    pub(crate) fn seek_at_or_before(&mut self, target: &Key) -> Result<()> {
        let Key::Bytes(target) = target else {
            let moved = self.iter.seek_to_last();
            return self.settle(moved.map(|()| true));
        };
        let moved = self.iter.seek(target).and_then(|()| {
            if !self.iter.is_valid() {
                self.iter.seek_to_last()
            } else if self.iter.key() == target.as_slice() {
                Ok(())
            } else {
                self.iter.prev()
            }
        });
        self.settle(moved.map(|()| true))
    }

    /// Recompute the current pair after the engine iterator moved.
    fn settle(&mut self, moved: Result<bool>) -> Result<()> {
        self.current = None;
        if !moved? || !self.iter.is_valid() {
            return Ok(());
        }
        let stored = self.iter.key();
        if !self.bounds.contains_bytes(stored) {
            return Ok(());
        }
        let key = stored[self.snapshot.prefix().len()..].to_vec();
        self.current = Some((key, self.iter.value().to_vec()));
        Ok(())
    }
}

/// Yields the current pair, then steps. Errors from stepping surface on the
/// next call, after which the cursor is exhausted.
impl Iterator for Cursor {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.deferred.take() {
            return Some(Err(e));
        }
        let pair = self.current.clone()?;
        if let Err(e) = self.step() {
            self.deferred = Some(e);
        }
        Some(Ok(pair))
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("snapshot", &self.snapshot)
            .field("key", &self.key().map(Key::from))
            .finish()
    }
}
