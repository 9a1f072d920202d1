use crate::error::{Error, Result};
use crate::types::{SequenceNumber, ValueType};

impl ValueType {
    fn from_u8(byte: u8) -> Result<Self> {
        match byte {
            0x01 => Ok(ValueType::Put),
            0x02 => Ok(ValueType::Delete),
            _ => Err(Error::Corruption(format!("invalid edit type: {}", byte))),
        }
    }
}

/// One edit inside a logged batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEdit {
    pub value_type: ValueType,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// An atomic group of edits as stored in the log.
///
/// On-disk format:
/// ```text
/// ┌──────────┬─────────┬──────────────┬────────────┬──────────────────┐
/// │ CRC (4B) │ Len (4B)│ Sequence (8B)│ Count (4B) │ Edits (var) ...  │
/// └──────────┴─────────┴──────────────┴────────────┴──────────────────┘
///
/// Edit: ┌──────────┬──────────────┬───────────┬──────────────┬───────────┐
///       │ Type (1B)│ Key Len (4B) │ Key (var) │ Val Len (4B) │ Val (var) │
///       └──────────┴──────────────┴───────────┴──────────────┴───────────┘
/// ```
///
/// CRC covers everything after the CRC field. Edit `i` carries sequence
/// number `sequence + i`. A batch is replayed whole or not at all: a record
/// that fails its CRC was torn by a crash and nothing after it is trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRecord {
    pub sequence: SequenceNumber,
    pub edits: Vec<LogEdit>,
}

const CRC_SIZE: usize = 4;
const LEN_SIZE: usize = 4;
const SEQ_SIZE: usize = 8;
const COUNT_SIZE: usize = 4;
pub const HEADER_SIZE: usize = CRC_SIZE + LEN_SIZE + SEQ_SIZE + COUNT_SIZE;
const EDIT_HEADER_SIZE: usize = 1 + 4 + 4;

fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    data.get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| Error::Corruption("record truncated".into()))
}

fn read_u64(data: &[u8], offset: usize) -> Result<u64> {
    data.get(offset..offset + 8)
        .and_then(|b| b.try_into().ok())
        .map(u64::from_le_bytes)
        .ok_or_else(|| Error::Corruption("record truncated".into()))
}

impl BatchRecord {
    pub fn new(sequence: SequenceNumber) -> Self {
        BatchRecord {
            sequence,
            edits: Vec::new(),
        }
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.edits.push(LogEdit {
            value_type: ValueType::Put,
            key,
            value,
        });
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.edits.push(LogEdit {
            value_type: ValueType::Delete,
            key,
            value: Vec::new(),
        });
    }

    /// Sequence number of the last edit. Equal to `sequence - 1` when empty.
    pub fn last_sequence(&self) -> SequenceNumber {
        (self.sequence + self.edits.len() as u64).saturating_sub(1)
    }

    /// Serialize this record to bytes (including CRC header).
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_size());

        // CRC placeholder, filled in last
        buf.extend_from_slice(&[0u8; CRC_SIZE]);
        let payload_len = self.encoded_size() - CRC_SIZE - LEN_SIZE;
        buf.extend_from_slice(&(payload_len as u32).to_le_bytes());
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        buf.extend_from_slice(&(self.edits.len() as u32).to_le_bytes());

        for edit in &self.edits {
            buf.push(edit.value_type as u8);
            buf.extend_from_slice(&(edit.key.len() as u32).to_le_bytes());
            buf.extend_from_slice(&edit.key);
            buf.extend_from_slice(&(edit.value.len() as u32).to_le_bytes());
            buf.extend_from_slice(&edit.value);
        }

        let crc = crc32fast::hash(&buf[CRC_SIZE..]);
        buf[0..CRC_SIZE].copy_from_slice(&crc.to_le_bytes());
        buf
    }

    /// Deserialize one record from the front of `data`. Returns error if the
    /// CRC doesn't match or the payload is malformed.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::Corruption("record too short".into()));
        }

        let stored_crc = read_u32(data, 0)?;
        let payload_len = read_u32(data, CRC_SIZE)? as usize;
        let total_len = CRC_SIZE + LEN_SIZE + payload_len;
        if data.len() < total_len {
            return Err(Error::Corruption("record truncated".into()));
        }

        let computed_crc = crc32fast::hash(&data[CRC_SIZE..total_len]);
        if stored_crc != computed_crc {
            return Err(Error::Corruption("CRC mismatch".into()));
        }

        let record = &data[..total_len];
        let sequence = read_u64(record, CRC_SIZE + LEN_SIZE)?;
        let count = read_u32(record, CRC_SIZE + LEN_SIZE + SEQ_SIZE)? as usize;
        let mut offset = HEADER_SIZE;
        let mut edits = Vec::with_capacity(count.min(payload_len / EDIT_HEADER_SIZE));

        for _ in 0..count {
            let value_type = ValueType::from_u8(
                *record
                    .get(offset)
                    .ok_or_else(|| Error::Corruption("record truncated".into()))?,
            )?;
            offset += 1;

            let key_len = read_u32(record, offset)? as usize;
            offset += 4;
            let key = record
                .get(offset..offset + key_len)
                .ok_or_else(|| Error::Corruption("key length exceeds record".into()))?
                .to_vec();
            offset += key_len;

            let value_len = read_u32(record, offset)? as usize;
            offset += 4;
            let value = record
                .get(offset..offset + value_len)
                .ok_or_else(|| Error::Corruption("value length exceeds record".into()))?
                .to_vec();
            offset += value_len;

            edits.push(LogEdit { value_type, key, value });
        }

        if offset != total_len {
            return Err(Error::Corruption("trailing bytes in record".into()));
        }

        Ok(BatchRecord { sequence, edits })
    }

    /// Size of this record when serialized on disk.
    pub fn encoded_size(&self) -> usize {
        HEADER_SIZE
            + self
                .edits
                .iter()
                .map(|e| EDIT_HEADER_SIZE + e.key.len() + e.value.len())
                .sum::<usize>()
    }
}
