//! Snapshots and write batches over typed keys and values.
//!
//! A [`TypedSnapshot`] is a [`Snapshot`] that encodes keys and decodes
//! pairs through [`Codec`]. Because the encodings preserve order, typed
//! ranges clamp the underlying byte view directly:
//!
//! ```no_run
//! use rangekv::{Db, Options, StorageEngine, WriteOptions};
//! use rangekv::typed::TypedBatch;
//!
//! # fn main() -> rangekv::Result<()> {
//! let db = Db::open_in_memory(Options::default())?;
//! let temps = TypedBatch::<i64, f64>::new();
//! temps.put(&-5, &-12.5);
//! temps.put(&0, &0.25);
//! temps.put(&7, &3.0);
//! db.write(temps.untyped(), WriteOptions::default())?;
//!
//! let view = db.snapshot().typed::<i64, f64>().range(-10..1);
//! assert_eq!(view.keys()?, vec![-5, 0]);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Bound, RangeBounds};

use crate::batch::WriteBatch;
use crate::codec::Codec;
use crate::cursor::Cursor;
use crate::error::Result;
use crate::key::Key;
use crate::snapshot::Snapshot;

fn start_key<K: Codec>(bound: Bound<&K>) -> Option<Key> {
    match bound {
        Bound::Included(k) => Some(Key::from(k.encode())),
        Bound::Excluded(k) => Some(Key::from(k.encode()).first_child()),
        Bound::Unbounded => None,
    }
}

fn end_key<K: Codec>(bound: Bound<&K>) -> Option<Key> {
    match bound {
        Bound::Included(k) => Some(Key::from(k.encode()).first_child()),
        Bound::Excluded(k) => Some(Key::from(k.encode())),
        Bound::Unbounded => None,
    }
}

fn decode_pair<K: Codec, V: Codec>(key: &[u8], value: &[u8]) -> Result<(K, V)> {
    Ok((K::decode(key)?, V::decode(value)?))
}

/// A [`Snapshot`] with keys of type `K` and values of type `V`.
pub struct TypedSnapshot<K, V> {
    view: Snapshot,
    _types: PhantomData<fn() -> (K, V)>,
}

impl<K: Codec, V: Codec> TypedSnapshot<K, V> {
    pub fn new(view: Snapshot) -> Self {
        TypedSnapshot {
            view,
            _types: PhantomData,
        }
    }

    /// The byte view underneath.
    pub fn untyped(&self) -> &Snapshot {
        &self.view
    }

    fn with(&self, view: Snapshot) -> Self {
        TypedSnapshot::new(view)
    }

    pub fn reversed(&self) -> Self {
        self.with(self.view.reversed())
    }

    pub fn noncaching(&self) -> Self {
        self.with(self.view.noncaching())
    }

    pub fn checksummed(&self) -> Self {
        self.with(self.view.checksummed())
    }

    /// Descend into the keys stored under the byte prefix `p`.
    pub fn prefixed(&self, p: &[u8]) -> Self {
        self.with(self.view.prefixed(p))
    }

    /// Narrow to the keys in `range`. Unbounded ends keep the current
    /// bound, as with [`Snapshot::clamp`].
    pub fn range<R: RangeBounds<K>>(&self, range: R) -> Self {
        let start = start_key(range.start_bound());
        let end = end_key(range.end_bound());
        self.with(self.view.clamp(start, end))
    }

    /// Keys strictly greater than `key`.
    pub fn after(&self, key: &K) -> Self {
        self.range((Bound::Excluded(key), Bound::Unbounded))
    }

    pub fn get(&self, key: &K) -> Result<Option<V>> {
        self.view
            .get(&key.encode())?
            .map(|bytes| V::decode(&bytes))
            .transpose()
    }

    pub fn contains_key(&self, key: &K) -> Result<bool> {
        self.view.contains_key(&key.encode())
    }

    /// Decoded pairs in view order.
    pub fn iter(&self) -> Result<TypedIter<K, V>> {
        Ok(TypedIter {
            cursor: self.view.cursor()?,
            _types: PhantomData,
        })
    }

    /// The first pair in view order. On a reversed view limited with
    /// `..=k` this is the floor entry of `k`.
    pub fn first(&self) -> Result<Option<(K, V)>> {
        self.iter()?.next().transpose()
    }

    pub fn keys(&self) -> Result<Vec<K>> {
        self.iter()?.map(|pair| pair.map(|(k, _)| k)).collect()
    }

    pub fn values(&self) -> Result<Vec<V>> {
        self.iter()?.map(|pair| pair.map(|(_, v)| v)).collect()
    }
}

impl<K, V> Clone for TypedSnapshot<K, V> {
    fn clone(&self) -> Self {
        TypedSnapshot {
            view: self.view.clone(),
            _types: PhantomData,
        }
    }
}

impl<K, V> fmt::Debug for TypedSnapshot<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypedSnapshot").field(&self.view).finish()
    }
}

/// Decoding iterator over a [`TypedSnapshot`]. A pair that fails to decode
/// is yielded as an error and iteration continues with the next one.
pub struct TypedIter<K, V> {
    cursor: Cursor,
    _types: PhantomData<fn() -> (K, V)>,
}

impl<K: Codec, V: Codec> Iterator for TypedIter<K, V> {
    type Item = Result<(K, V)>;

    fn next(&mut self) -> Option<Self::Item> {
        let pair = self.cursor.next()?;
        Some(pair.and_then(|(k, v)| decode_pair(&k, &v)))
    }
}

/// A [`WriteBatch`] with keys of type `K` and values of type `V`.
///
/// Shares its edit buffer with the batch it was made from, so typed and
/// byte edits can be mixed in one atomic write.
pub struct TypedBatch<K, V> {
    batch: WriteBatch,
    _types: PhantomData<fn() -> (K, V)>,
}

impl<K: Codec, V: Codec> TypedBatch<K, V> {
    pub fn new() -> Self {
        TypedBatch::over(WriteBatch::new())
    }

    pub fn over(batch: WriteBatch) -> Self {
        TypedBatch {
            batch,
            _types: PhantomData,
        }
    }

    /// The byte batch underneath; pass this to
    /// [`StorageEngine::write`](crate::engine::StorageEngine::write).
    pub fn untyped(&self) -> &WriteBatch {
        &self.batch
    }

    pub fn put(&self, key: &K, value: &V) {
        self.batch.put(&key.encode(), &value.encode());
    }

    pub fn remove(&self, key: &K) {
        self.batch.remove(&key.encode());
    }

    /// Put `value` under `key`, or delete `key` when `value` is `None`.
    pub fn set(&self, key: &K, value: Option<&V>) {
        match value {
            Some(value) => self.put(key, value),
            None => self.remove(key),
        }
    }

    /// A view that writes under the byte prefix `p`.
    pub fn prefixed(&self, p: &[u8]) -> Self {
        TypedBatch::over(self.batch.prefixed(p))
    }

    /// Pending state of `key`, as [`WriteBatch::get`].
    pub fn get(&self, key: &K) -> Result<Option<Option<V>>> {
        match self.batch.get(&key.encode()) {
            Some(Some(bytes)) => Ok(Some(Some(V::decode(&bytes)?))),
            Some(None) => Ok(Some(None)),
            None => Ok(None),
        }
    }

    /// Edits within this view in insertion order, decoded. Fails on the
    /// first edit that does not decode as `(K, V)`.
    pub fn pending(&self) -> Result<Vec<(K, Option<V>)>> {
        let mut raw = Vec::new();
        self.batch.enumerate(|key, value| raw.push((key.to_vec(), value.map(<[u8]>::to_vec))));
        raw.into_iter()
            .map(|(key, value)| Ok((K::decode(&key)?, value.as_deref().map(V::decode).transpose()?)))
            .collect()
    }

    pub fn clear(&self) {
        self.batch.clear();
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }
}

impl<K: Codec, V: Codec> Default for TypedBatch<K, V> {
    fn default() -> Self {
        TypedBatch::new()
    }
}

impl<K, V> fmt::Debug for TypedBatch<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypedBatch").field(&self.batch).finish()
    }
}
