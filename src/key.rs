//! Total order over byte strings extended with an infinity sentinel.
//!
//! Finite keys compare by ordinary lexicographic byte comparison (a proper
//! prefix sorts first). [`Key::Infinity`] compares greater than every finite
//! key and equal to itself, and is a fixed point of [`Key::next_sibling`] and
//! [`Key::first_child`], so it propagates safely through chained calls.

use std::cmp::Ordering;
use std::fmt;

/// A key-space position: a finite byte string or the infinity sentinel.
///
/// The derived order is the key order: variants compare by declaration order
/// first, so every `Bytes` sorts below `Infinity`, and `Vec<u8>` compares
/// lexicographically.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Bytes(Vec<u8>),
    Infinity,
}

impl Key {
    /// The empty byte string, the least key.
    pub fn empty() -> Key {
        Key::Bytes(Vec::new())
    }

    pub fn is_infinity(&self) -> bool {
        matches!(self, Key::Infinity)
    }

    /// The finite bytes, or `None` at infinity.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Key::Bytes(bytes) => Some(bytes),
            Key::Infinity => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Key::Bytes(bytes) => Some(bytes),
            Key::Infinity => None,
        }
    }

    /// Three-way comparison under the key order.
    pub fn compare(&self, other: &Key) -> Ordering {
        self.cmp(other)
    }

    /// Least key greater than `self` and every extension of `self`.
    ///
    /// Trailing `0xFF` bytes are dropped and the last remaining byte is
    /// incremented, so a key without trailing `0xFF` keeps its length. The
    /// empty key and all-`0xFF` keys have no finite successor and map to
    /// infinity.
    pub fn next_sibling(&self) -> Key {
        let Key::Bytes(bytes) = self else {
            return Key::Infinity;
        };
        match bytes.iter().rposition(|&b| b != 0xFF) {
            Some(i) => {
                let mut next = bytes[..=i].to_vec();
                next[i] += 1;
                Key::Bytes(next)
            }
            None => Key::Infinity,
        }
    }

    /// `self` followed by a single `0x00`: the least key with `self` as a
    /// strict prefix, and the immediate successor of `self`.
    pub fn first_child(&self) -> Key {
        match self {
            Key::Bytes(bytes) => {
                let mut child = Vec::with_capacity(bytes.len() + 1);
                child.extend_from_slice(bytes);
                child.push(0x00);
                Key::Bytes(child)
            }
            Key::Infinity => Key::Infinity,
        }
    }

    /// Whether `self` is finite and begins with `prefix`.
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.as_bytes().is_some_and(|bytes| bytes.starts_with(prefix))
    }

    /// Translate into a key space nested under `prefix`.
    ///
    /// Infinity maps to the end of the prefix range, `prefix.next_sibling()`.
    pub fn prefixed_by(&self, prefix: &[u8]) -> Key {
        match self {
            Key::Bytes(bytes) => {
                let mut full = Vec::with_capacity(prefix.len() + bytes.len());
                full.extend_from_slice(prefix);
                full.extend_from_slice(bytes);
                Key::Bytes(full)
            }
            Key::Infinity => Key::from(prefix).next_sibling(),
        }
    }
}

/// Three-way comparison under the key order.
pub fn compare(left: &Key, right: &Key) -> Ordering {
    left.cmp(right)
}

/// The lesser of two keys (the left one on ties).
pub fn min<'a>(left: &'a Key, right: &'a Key) -> &'a Key {
    if right < left { right } else { left }
}

/// The greater of two keys (the right one on ties).
pub fn max<'a>(left: &'a Key, right: &'a Key) -> &'a Key {
    if right >= left { right } else { left }
}

impl Default for Key {
    fn default() -> Self {
        Key::empty()
    }
}

impl From<Vec<u8>> for Key {
    fn from(bytes: Vec<u8>) -> Self {
        Key::Bytes(bytes)
    }
}

impl From<&[u8]> for Key {
    fn from(bytes: &[u8]) -> Self {
        Key::Bytes(bytes.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Key {
    fn from(bytes: &[u8; N]) -> Self {
        Key::Bytes(bytes.to_vec())
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Bytes(s.as_bytes().to_vec())
    }
}

/// `None` denotes infinity.
impl From<Option<Vec<u8>>> for Key {
    fn from(bytes: Option<Vec<u8>>) -> Self {
        bytes.map_or(Key::Infinity, Key::Bytes)
    }
}

impl PartialEq<[u8]> for Key {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes() == Some(other)
    }
}

impl PartialEq<&[u8]> for Key {
    fn eq(&self, other: &&[u8]) -> bool {
        self.as_bytes() == Some(*other)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Bytes(bytes) => write!(f, "{:?}", bytes.escape_ascii().to_string()),
            Key::Infinity => f.write_str("Infinity"),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Bytes(bytes) => write!(f, "{}", bytes.escape_ascii()),
            Key::Infinity => f.write_str("∞"),
        }
    }
}
