//! Composable read views over one point-in-time engine state.
//!
//! A [`Snapshot`] pairs a shared [`ReadHandle`] with a view configuration:
//! a stored-key prefix, an interval in the un-prefixed key space, an
//! iteration direction and two read flags. Every composition method returns
//! a new view over the same handle; none of them touch the engine.
//!
//! ```text
//! logical key  k   ──prefix──►  stored key  P ++ k
//! interval [s, e)  ──prefix──►  [P ++ s, P ++ e)      (e = ∞  ↦  next_sibling(P))
//! ```

use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

use crate::codec::Codec;
use crate::cursor::Cursor;
use crate::engine::{ReadHandle, ReadOptions};
use crate::error::Result;
use crate::interval::Interval;
use crate::key::{self, Key};
use crate::typed::TypedSnapshot;
use crate::types::SequenceNumber;

/// An immutable, cheaply clonable view over a pinned engine state.
#[derive(Clone)]
pub struct Snapshot {
    handle: Arc<dyn ReadHandle>,
    prefix: Vec<u8>,
    interval: Interval,
    reversed: bool,
    noncaching: bool,
    checksummed: bool,
}

impl Snapshot {
    /// A view of the whole key space of `handle`.
    pub fn new(handle: Arc<dyn ReadHandle>) -> Self {
        Snapshot {
            handle,
            prefix: Vec::new(),
            interval: Interval::everything(),
            reversed: false,
            noncaching: false,
            checksummed: false,
        }
    }

    pub fn handle(&self) -> &Arc<dyn ReadHandle> {
        &self.handle
    }

    /// Engine sequence number pinned by the underlying handle.
    pub fn sequence(&self) -> SequenceNumber {
        self.handle.sequence()
    }

    /// Bytes prepended to every logical key before it reaches the engine.
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// Visible range, in the un-prefixed key space.
    pub fn interval(&self) -> &Interval {
        &self.interval
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn is_noncaching(&self) -> bool {
        self.noncaching
    }

    pub fn is_checksummed(&self) -> bool {
        self.checksummed
    }

    fn with_interval(&self, interval: Interval) -> Snapshot {
        Snapshot {
            interval,
            ..self.clone()
        }
    }

    /// Reads through this view no longer populate the engine cache.
    pub fn noncaching(&self) -> Snapshot {
        Snapshot {
            noncaching: true,
            ..self.clone()
        }
    }

    /// Reads through this view verify stored checksums.
    pub fn checksummed(&self) -> Snapshot {
        Snapshot {
            checksummed: true,
            ..self.clone()
        }
    }

    /// Iteration and enumeration run in descending key order.
    pub fn reversed(&self) -> Snapshot {
        Snapshot {
            reversed: true,
            ..self.clone()
        }
    }

    /// Narrow to `[start, end)`. A `None` bound keeps the current bound
    /// (it does *not* mean unbounded, unlike [`Interval::new`] with
    /// [`Key::Infinity`]). The result never extends past the current
    /// interval.
    pub fn clamp(&self, start: Option<Key>, end: Option<Key>) -> Snapshot {
        let requested = Interval::new(
            start.unwrap_or_else(|| self.interval.start().clone()),
            end.unwrap_or_else(|| self.interval.end().clone()),
        );
        self.with_interval(self.interval.clamp(&requested))
    }

    /// Keys `>= start`.
    pub fn clamp_from(&self, start: impl Into<Key>) -> Snapshot {
        self.clamp(Some(start.into()), None)
    }

    /// Keys `< end`.
    pub fn clamp_to(&self, end: impl Into<Key>) -> Snapshot {
        self.clamp(None, Some(end.into()))
    }

    /// Keys `<= end`.
    pub fn clamp_through(&self, end: impl Into<Key>) -> Snapshot {
        self.clamp(None, Some(end.into().first_child()))
    }

    /// Keys strictly greater than `exclusive_start`.
    pub fn after(&self, exclusive_start: impl Into<Key>) -> Snapshot {
        self.clamp(Some(exclusive_start.into().first_child()), None)
    }

    /// Replace the interval with `other.clamp(current)`: the part of the
    /// current interval that falls inside `other`.
    pub fn clamp_to_interval(&self, other: &Interval) -> Snapshot {
        self.with_interval(other.clamp(&self.interval))
    }

    /// Keys that begin with `p`. Unlike [`Snapshot::prefixed`] the keys keep
    /// `p`.
    pub fn starting_with(&self, p: &[u8]) -> Snapshot {
        let range = Interval::new(p, Key::from(p).next_sibling());
        self.with_interval(self.interval.clamp(&range))
    }

    /// Descend into the keys under `p`: the stored prefix grows by `p` and
    /// `p` is stripped from both interval bounds.
    pub fn prefixed(&self, p: &[u8]) -> Snapshot {
        let mut prefix = Vec::with_capacity(self.prefix.len() + p.len());
        prefix.extend_from_slice(&self.prefix);
        prefix.extend_from_slice(p);
        Snapshot {
            prefix,
            interval: self.interval.strip_prefix(p),
            ..self.clone()
        }
    }

    /// The visible range translated into engine key space.
    pub fn stored_interval(&self) -> Interval {
        self.interval.with_prefix(&self.prefix)
    }

    pub(crate) fn read_options(&self) -> ReadOptions {
        ReadOptions {
            verify_checksums: self.checksummed,
            fill_cache: !self.noncaching,
        }
    }

    fn stored_key(&self, key: &[u8]) -> Vec<u8> {
        let mut full = Vec::with_capacity(self.prefix.len() + key.len());
        full.extend_from_slice(&self.prefix);
        full.extend_from_slice(key);
        full
    }

    /// Value stored under logical `key`, or `None` when absent or outside
    /// the interval.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if !self.interval.contains_bytes(key) {
            return Ok(None);
        }
        self.handle.get(&self.stored_key(key), self.read_options())
    }

    /// Whether a value is stored under logical `key`.
    pub fn contains_key(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Greatest stored key `<= key` inside the interval, or the interval's
    /// start when there is none.
    pub fn floor_key(&self, key: impl Into<Key>) -> Result<Key> {
        let key = key.into();
        let found = if key < *self.interval.start() {
            None
        } else {
            let mut cursor = Cursor::unpositioned(self.clone())?;
            if key >= *self.interval.end() {
                cursor.seek_to_last_in_bounds()?;
            } else {
                cursor.seek_at_or_before(&key.prefixed_by(&self.prefix))?;
            }
            cursor.key().map(Key::from)
        };
        Ok(found.unwrap_or_else(|| self.interval.start().clone()))
    }

    /// Least stored key `>= key` inside the interval, or the interval's end
    /// when there is none.
    pub fn ceil_key(&self, key: impl Into<Key>) -> Result<Key> {
        let key = key.into();
        let found = if key >= *self.interval.end() {
            None
        } else {
            let mut cursor = Cursor::unpositioned(self.clone())?;
            let target = key::max(self.interval.start(), &key).prefixed_by(&self.prefix);
            cursor.seek_at_or_after(&target)?;
            cursor.key().map(Key::from)
        };
        Ok(found.unwrap_or_else(|| self.interval.end().clone()))
    }

    /// Visit every pair in the view, in view order, with the prefix
    /// stripped. Stops early when `visit` breaks.
    pub fn enumerate<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]) -> ControlFlow<()>,
    {
        let mut cursor = self.cursor()?;
        while let (Some(key), Some(value)) = (cursor.key(), cursor.value()) {
            if visit(key, value).is_break() {
                break;
            }
            cursor.step()?;
        }
        Ok(())
    }

    /// A cursor positioned at the first pair in view order.
    pub fn cursor(&self) -> Result<Cursor> {
        Cursor::new(self.clone())
    }

    /// Every key in view order.
    pub fn keys(&self) -> Result<Vec<Vec<u8>>> {
        let mut keys = Vec::new();
        self.enumerate(|k, _| {
            keys.push(k.to_vec());
            ControlFlow::Continue(())
        })?;
        Ok(keys)
    }

    /// This view with keys decoded as `K` and values as `V`.
    pub fn typed<K: Codec, V: Codec>(&self) -> TypedSnapshot<K, V> {
        TypedSnapshot::new(self.clone())
    }

    /// Every value in view order.
    pub fn values(&self) -> Result<Vec<Vec<u8>>> {
        let mut values = Vec::new();
        self.enumerate(|_, v| {
            values.push(v.to_vec());
            ControlFlow::Continue(())
        })?;
        Ok(values)
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("sequence", &self.handle.sequence())
            .field("prefix", &Key::from(self.prefix.as_slice()))
            .field("interval", &self.interval)
            .field("reversed", &self.reversed)
            .field("noncaching", &self.noncaching)
            .field("checksummed", &self.checksummed)
            .finish()
    }
}
