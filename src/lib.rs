//! # rangekv
//!
//! Half-open key-range algebra and composable snapshot views over an
//! embedded ordered key-value store.
//!
//! ## Core idea
//! Keys are byte strings plus an infinity sentinel ([`Key`]). An
//! [`Interval`] is a half-open range of keys that never fails to construct:
//! inverted bounds collapse to the empty interval. A [`Snapshot`] is an
//! immutable view over one pinned engine state, narrowed by clamping and
//! re-rooted by prefixing, and walked with a [`Cursor`]. Writes are buffered
//! in a [`WriteBatch`] and applied atomically. Keys and values of other
//! types go through a [`Codec`] whose encoding keeps their order.
//!
//! ```no_run
//! use rangekv::{Db, Key, Options, StorageEngine, WriteBatch, WriteOptions};
//!
//! # fn main() -> rangekv::Result<()> {
//! let db = Db::open("/tmp/example-db", Options::default())?;
//! let batch = WriteBatch::new();
//! let users = batch.prefixed(b"users/");
//! users.put(b"ann", b"1");
//! users.put(b"bob", b"2");
//! db.write(&batch, WriteOptions::default())?;
//!
//! let view = db.snapshot().prefixed(b"users/").clamp_from("b");
//! assert_eq!(view.keys()?, vec![b"bob".to_vec()]);
//! assert_eq!(view.ceil_key("a")?, Key::from("bob"));
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod cache;
pub mod codec;
pub mod cursor;
pub mod db;
pub mod engine;
pub mod error;
pub mod interval;
pub mod iterator;
pub mod key;
pub mod memtable;
pub mod snapshot;
pub mod typed;
pub mod types;
pub mod wal;

// Public re-exports for the top-level API
pub use batch::WriteBatch;
pub use codec::Codec;
pub use cursor::Cursor;
pub use db::{Db, Options, Stats};
pub use engine::{ReadHandle, ReadOptions, StorageEngine, WriteOptions};
pub use error::{Error, Result};
pub use interval::Interval;
pub use key::Key;
pub use snapshot::Snapshot;
pub use typed::{TypedBatch, TypedSnapshot};
pub use wal::SyncPolicy;
