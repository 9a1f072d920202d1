use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::codec::Codec;
use crate::typed::TypedBatch;

/// One buffered edit, keyed in engine space (prefix included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl Edit {
    pub fn key(&self) -> &[u8] {
        match self {
            Edit::Put { key, .. } | Edit::Delete { key } => key,
        }
    }

    /// The value, or `None` for a delete.
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            Edit::Put { value, .. } => Some(value),
            Edit::Delete { .. } => None,
        }
    }
}

/// An ordered buffer of puts and deletes, applied atomically by
/// [`StorageEngine::write`](crate::engine::StorageEngine::write).
///
/// Views made with [`WriteBatch::prefixed`] share one edit buffer. The
/// buffer is reference counted without locking, so a batch and its views
/// are neither `Send` nor `Sync`: they stay on the thread that built them.
#[derive(Clone, Default)]
pub struct WriteBatch {
    prefix: Vec<u8>,
    edits: Rc<RefCell<Vec<Edit>>>,
}

impl WriteBatch {
    pub fn new() -> Self {
        WriteBatch::default()
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    fn stored_key(&self, key: &[u8]) -> Vec<u8> {
        let mut full = Vec::with_capacity(self.prefix.len() + key.len());
        full.extend_from_slice(&self.prefix);
        full.extend_from_slice(key);
        full
    }

    /// Put `value` under `key`, or delete `key` when `value` is `None`.
    pub fn set(&self, key: &[u8], value: Option<&[u8]>) {
        match value {
            Some(value) => self.put(key, value),
            None => self.remove(key),
        }
    }

    pub fn put(&self, key: &[u8], value: &[u8]) {
        self.edits.borrow_mut().push(Edit::Put {
            key: self.stored_key(key),
            value: value.to_vec(),
        });
    }

    pub fn remove(&self, key: &[u8]) {
        self.edits.borrow_mut().push(Edit::Delete {
            key: self.stored_key(key),
        });
    }

    /// A view that writes into the same buffer under `self.prefix ++ p`.
    pub fn prefixed(&self, p: &[u8]) -> WriteBatch {
        WriteBatch {
            prefix: self.stored_key(p),
            edits: Rc::clone(&self.edits),
        }
    }

    /// Replay edits in insertion order with the prefix stripped. Edits made
    /// through other views that fall outside this view's prefix are skipped.
    pub fn enumerate<F>(&self, mut visit: F)
    where
        F: FnMut(&[u8], Option<&[u8]>),
    {
        for edit in self.edits.borrow().iter() {
            if let Some(key) = edit.key().strip_prefix(self.prefix.as_slice()) {
                visit(key, edit.value());
            }
        }
    }

    /// The pending state of `key`: `Some(Some(v))` for a put, `Some(None)`
    /// for a delete, `None` if the batch does not touch it.
    pub fn get(&self, key: &[u8]) -> Option<Option<Vec<u8>>> {
        let stored = self.stored_key(key);
        self.edits
            .borrow()
            .iter()
            .rev()
            .find(|edit| edit.key() == stored.as_slice())
            .map(|edit| edit.value().map(<[u8]>::to_vec))
    }

    /// Last edit per key within this view, in key order.
    pub fn diff(&self) -> BTreeMap<Vec<u8>, Option<Vec<u8>>> {
        let mut last = BTreeMap::new();
        self.enumerate(|key, value| {
            last.insert(key.to_vec(), value.map(<[u8]>::to_vec));
        });
        last
    }

    /// Drop every buffered edit, including those made through other views.
    pub fn clear(&self) {
        self.edits.borrow_mut().clear();
    }

    /// Edits in the shared buffer, across all views.
    pub fn len(&self) -> usize {
        self.edits.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.borrow().is_empty()
    }

    /// A typed view writing into the same buffer.
    pub fn typed<K: Codec, V: Codec>(&self) -> TypedBatch<K, V> {
        TypedBatch::over(self.clone())
    }

    /// Engine-space edits in insertion order.
    pub fn edits(&self) -> Vec<Edit> {
        self.edits.borrow().clone()
    }
}

impl fmt::Debug for WriteBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteBatch")
            .field("prefix", &self.prefix.escape_ascii().to_string())
            .field("edits", &self.len())
            .finish()
    }
}
