//! In-memory entry buffer
//!
//! Entries are produced in source order, sorted once by key bytes, and fed
//! to a builder in that order.

use crate::table::{IndexBuilder, TableResult};

/// `(key, payload)` pairs awaiting insertion
#[derive(Debug, Default, Clone)]
pub struct SortedEntries {
    entries: Vec<(Vec<u8>, u64)>,
    sorted: bool,
}

impl SortedEntries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            sorted: false,
        }
    }

    pub fn push(&mut self, key: Vec<u8>, payload: u64) {
        self.entries.push((key, payload));
        self.sorted = false;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stable sort by key bytes; equal keys keep source order.
    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
        self.sorted = true;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], u64)> {
        self.entries.iter().map(|(k, v)| (k.as_slice(), *v))
    }

    /// Inserts every entry into `builder` in key order and seals it.
    ///
    /// Sorts first if needed. A duplicate key surfaces as the builder's
    /// out-of-order error.
    pub fn write_to<B: IndexBuilder>(self, mut builder: B) -> TableResult<B::Output> {
        self.insert_into(&mut builder)?;
        builder.finish()
    }

    /// Inserts every entry into `builder` in key order, leaving it open.
    pub fn insert_into<B: IndexBuilder>(mut self, builder: &mut B) -> TableResult<()> {
        if !self.sorted {
            self.sort();
        }
        for (key, payload) in &self.entries {
            builder.insert(key, *payload)?;
        }
        Ok(())
    }
}
