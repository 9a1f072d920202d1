use crate::error::Result;

/// Positioned iteration over a sorted key-value source.
///
/// The engine exposes one of these per [`ReadHandle`](crate::engine::ReadHandle);
/// [`Cursor`](crate::cursor::Cursor) drives it and never touches engine
/// internals. Positioning calls may fail on IO or checksum errors, after which
/// the iterator is invalid.
pub trait StorageIterator {
    /// Current key. Only meaningful when `is_valid()`.
    fn key(&self) -> &[u8];

    /// Current value. Only meaningful when `is_valid()`.
    fn value(&self) -> &[u8];

    fn is_valid(&self) -> bool;

    /// Advance to the next entry.
    fn next(&mut self) -> Result<()>;

    /// Step back to the previous entry.
    fn prev(&mut self) -> Result<()>;

    /// Position at the first entry with key >= `target`.
    fn seek(&mut self, target: &[u8]) -> Result<()>;

    fn seek_to_first(&mut self) -> Result<()>;

    fn seek_to_last(&mut self) -> Result<()>;
}

impl<I: StorageIterator + ?Sized> StorageIterator for Box<I> {
    fn key(&self) -> &[u8] {
        (**self).key()
    }

    fn value(&self) -> &[u8] {
        (**self).value()
    }

    fn is_valid(&self) -> bool {
        (**self).is_valid()
    }

    fn next(&mut self) -> Result<()> {
        (**self).next()
    }

    fn prev(&mut self) -> Result<()> {
        (**self).prev()
    }

    fn seek(&mut self, target: &[u8]) -> Result<()> {
        (**self).seek(target)
    }

    fn seek_to_first(&mut self) -> Result<()> {
        (**self).seek_to_first()
    }

    fn seek_to_last(&mut self) -> Result<()> {
        (**self).seek_to_last()
    }
}
