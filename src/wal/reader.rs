use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::wal::record::BatchRecord;

/// Reads logged batches from a file for crash recovery.
///
/// Loads the entire file into memory, then iterates record by record.
pub struct WALReader {
    data: Vec<u8>,
}

impl WALReader {
    /// Open a log file for reading.
    pub fn new(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        Ok(WALReader { data })
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        WALReader { data }
    }

    /// Total bytes in the file.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> WALIterator<'_> {
        WALIterator {
            data: &self.data,
            offset: 0,
            failed: false,
        }
    }
}

/// Iterator over logged batches.
///
/// Yields records until EOF. At the first undecodable record it yields that
/// error once and then stops: writes are sequential and append-only, so
/// nothing after a torn record can be trusted. [`WALIterator::offset`] is
/// then the length of the valid prefix.
pub struct WALIterator<'a> {
    data: &'a [u8],
    offset: usize,
    failed: bool,
}

impl WALIterator<'_> {
    /// Bytes consumed by the records yielded so far.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Iterator for WALIterator<'_> {
    type Item = Result<BatchRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.data.len() {
            return None;
        }

        match BatchRecord::decode(&self.data[self.offset..]) {
            Ok(record) => {
                self.offset += record.encoded_size();
                Some(Ok(record))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
