//! Ordered index engine
//!
//! The only code that touches the physical index format. Callers program
//! against two capabilities:
//!
//! - [`IndexBuilder`]: accepts `(key, u64)` pairs in strictly increasing key
//!   order and seals them
//! - [`OrderedIndex`]: exact `get` and half-open ascending `range`
//!
//! Two engines implement them: [`SortedTable`], an immutable memory-mapped
//! sorted-string table published atomically, and [`MemoryIndex`], a
//! BTreeMap used for small indexes and as a reference in tests.
//!
//! # Invariants
//!
//! - Keys inside one index are unique and strictly increasing
//! - A published table file is complete; partial files are never visible
//! - Identical input produces byte-identical table files

mod builder;
mod errors;
mod format;
mod memory;
mod publish;
mod reader;

pub use builder::{SealedTable, SortedTableBuilder, StagedTable};
pub use errors::{TableError, TableErrorCode, TableResult};
pub use memory::{MemoryIndex, MemoryIndexBuilder, MemoryRange};
pub use publish::{seal_bytes, write_atomic, AtomicFile, SealedFile};
pub use reader::{SortedRange, SortedTable};

/// Read capability of an immutable sorted byte-key to u64 mapping.
pub trait OrderedIndex {
    /// Lazy ascending cursor. `Some(Ok)` is an entry, `None` is clean
    /// exhaustion and `Some(Err)` is a failure of the underlying structure.
    type Range<'a>: Iterator<Item = TableResult<(&'a [u8], u64)>>
    where
        Self: 'a;

    /// Exact lookup.
    fn get(&self, key: &[u8]) -> TableResult<Option<u64>>;

    /// Every entry with `lower <= key < upper`; `None` leaves the range
    /// unbounded above.
    fn range<'a>(&'a self, lower: &[u8], upper: Option<&[u8]>) -> Self::Range<'a>;

    /// Number of entries
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Write capability: sequential insertion of strictly increasing keys.
pub trait IndexBuilder {
    type Output;

    /// Appends one entry. A key not greater than its predecessor fails with
    /// [`TableErrorCode::OutOfOrder`].
    fn insert(&mut self, key: &[u8], value: u64) -> TableResult<()>;

    /// Seals the index.
    fn finish(self) -> TableResult<Self::Output>;
}
