use std::cmp::Ordering;

/// Raw user key bytes, as stored in the engine (prefix included).
pub type UserKey = Vec<u8>;

/// Monotonically increasing counter assigned to each edit.
pub type SequenceNumber = u64;

/// Largest sequence number; seeking with it lands on the newest version.
pub const MAX_SEQUENCE: SequenceNumber = u64::MAX;

/// Distinguishes puts from deletes in the storage engine.
/// A delete writes a tombstone that shadows older versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// A normal put operation.
    Put = 0x01,
    /// A delete (tombstone marker).
    Delete = 0x02,
}

/// Internal key format: user key + sequence number + value type.
///
/// Ordering: (user_key ASC, sequence DESC).
/// The newest version of a key always comes first, so the first entry at or
/// after `(key, snapshot_sequence)` is the version visible to that snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InternalKey {
    pub user_key: UserKey,
    pub sequence: SequenceNumber,
    pub value_type: ValueType,
}

impl InternalKey {
    pub fn new(user_key: UserKey, sequence: SequenceNumber, value_type: ValueType) -> Self {
        InternalKey {
            user_key,
            sequence,
            value_type,
        }
    }

    /// Search key positioned before every version of `user_key` visible at
    /// `sequence`.
    pub fn seek_key(user_key: &[u8], sequence: SequenceNumber) -> Self {
        InternalKey::new(user_key.to_vec(), sequence, ValueType::Put)
    }

    pub fn is_tombstone(&self) -> bool {
        self.value_type == ValueType::Delete
    }
}

impl PartialOrd for InternalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InternalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.user_key
            .cmp(&other.user_key)
            .then_with(|| other.sequence.cmp(&self.sequence))
            .then_with(|| (self.value_type as u8).cmp(&(other.value_type as u8)))
    }
}
