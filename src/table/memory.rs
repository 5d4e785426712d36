//! BTreeMap-backed ordered index
//!
//! Same contract as the sorted table (strictly increasing inserts, exact get,
//! half-open ascending ranges) without a file. Useful for small indexes and
//! as a reference engine when checking the on-disk format.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::ops::Bound;

use super::errors::{TableError, TableResult};
use super::{IndexBuilder, OrderedIndex};

/// An in-memory ordered byte-key to u64 map.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryIndex {
    tree: BTreeMap<Vec<u8>, u64>,
}

impl MemoryIndex {
    /// Starts a builder
    pub fn builder() -> MemoryIndexBuilder {
        MemoryIndexBuilder::default()
    }
}

impl OrderedIndex for MemoryIndex {
    type Range<'a> = MemoryRange<'a>;

    fn get(&self, key: &[u8]) -> TableResult<Option<u64>> {
        Ok(self.tree.get(key).copied())
    }

    fn range<'a>(&'a self, lower: &[u8], upper: Option<&[u8]>) -> MemoryRange<'a> {
        // BTreeMap::range panics on an inverted range
        if matches!(upper, Some(u) if u < lower) {
            return MemoryRange { inner: None };
        }
        let upper_bound = match upper {
            Some(u) => Bound::Excluded(u),
            None => Bound::Unbounded,
        };
        MemoryRange {
            inner: Some(
                self.tree
                    .range::<[u8], _>((Bound::Included(lower), upper_bound)),
            ),
        }
    }

    fn len(&self) -> u64 {
        self.tree.len() as u64
    }
}

/// Ascending iterator over a [`MemoryIndex`] range. Never fails.
pub struct MemoryRange<'a> {
    inner: Option<btree_map::Range<'a, Vec<u8>, u64>>,
}

impl<'a> Iterator for MemoryRange<'a> {
    type Item = TableResult<(&'a [u8], u64)>;

    fn next(&mut self) -> Option<Self::Item> {
        let (key, value) = self.inner.as_mut()?.next()?;
        Some(Ok((key.as_slice(), *value)))
    }
}

/// Builder enforcing the same monotonic insertion contract as the table.
#[derive(Debug, Default)]
pub struct MemoryIndexBuilder {
    tree: BTreeMap<Vec<u8>, u64>,
}

impl IndexBuilder for MemoryIndexBuilder {
    type Output = MemoryIndex;

    fn insert(&mut self, key: &[u8], value: u64) -> TableResult<()> {
        if let Some((last, _)) = self.tree.last_key_value() {
            if key <= last.as_slice() {
                return Err(TableError::out_of_order(last, key));
            }
        }
        self.tree.insert(key.to_vec(), value);
        Ok(())
    }

    fn finish(self) -> TableResult<MemoryIndex> {
        Ok(MemoryIndex { tree: self.tree })
    }
}
