//! Memory-mapped sorted table reader
//!
//! Opening maps the file and validates header, footer and offset table
//! bounds; no decoding happens up front. Lookups binary-search the offset
//! table. The mapping is read-only and shared, so any number of threads may
//! query one table concurrently.

use std::fs::File;
use std::path::{Path, PathBuf};

use crc32fast::Hasher;
use memmap2::Mmap;

use super::errors::{TableError, TableResult};
use super::format::{
    check_header, read_u16, read_u64, Footer, ENTRY_OVERHEAD, FOOTER_LEN, HEADER_LEN, OFFSET_WIDTH,
};
use super::OrderedIndex;

/// An immutable, memory-mapped sorted byte-key to u64 table.
#[derive(Debug)]
pub struct SortedTable {
    path: PathBuf,
    mmap: Mmap,
    entry_count: u64,
    offset_table_pos: usize,
    checksum: u32,
}

impl SortedTable {
    /// Maps a sealed table.
    pub fn open(path: &Path) -> TableResult<Self> {
        let file = File::open(path)
            .map_err(|e| TableError::open_failed("failed to open table", path, e))?;
        let file_len = file
            .metadata()
            .map_err(|e| TableError::open_failed("failed to read table metadata", path, e))?
            .len();
        if file_len < (HEADER_LEN + FOOTER_LEN) as u64 {
            return Err(TableError::corruption(
                format!("file of {} bytes is too small to be a table", file_len),
                path,
            ));
        }

        // Sealed tables are never written in place; rebuilds publish by rename.
        let mmap = unsafe { Mmap::map(&file) }
            .map_err(|e| TableError::open_failed("failed to map table", path, e))?;

        check_header(&mmap, path)?;
        let footer = Footer::decode(&mmap, path)?;

        let footer_pos = mmap.len() - FOOTER_LEN;
        let table_len = footer
            .entry_count
            .checked_mul(OFFSET_WIDTH as u64)
            .and_then(|len| len.checked_add(footer.offset_table_pos));
        if footer.offset_table_pos < HEADER_LEN as u64 || table_len != Some(footer_pos as u64) {
            return Err(TableError::corruption(
                format!(
                    "offset table at {} with {} entries does not end at footer {}",
                    footer.offset_table_pos, footer.entry_count, footer_pos
                ),
                path,
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            entry_count: footer.entry_count,
            offset_table_pos: footer.offset_table_pos as usize,
            checksum: footer.checksum,
            mmap,
        })
    }

    /// Path of the mapped file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored crc32 of the table body
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    /// Size of the mapped file in bytes
    pub fn file_len(&self) -> u64 {
        self.mmap.len() as u64
    }

    /// Recomputes the crc32 over the whole body and compares it to the footer.
    ///
    /// This touches every page of the file.
    pub fn verify_checksum(&self) -> TableResult<()> {
        let mut hasher = Hasher::new();
        hasher.update(&self.mmap[..self.mmap.len() - FOOTER_LEN]);
        let actual = hasher.finalize();
        if actual != self.checksum {
            return Err(TableError::corruption(
                format!(
                    "checksum mismatch: stored {:08x}, computed {:08x}",
                    self.checksum, actual
                ),
                &self.path,
            ));
        }
        Ok(())
    }

    /// Iterates every entry in key order.
    pub fn iter(&self) -> SortedRange<'_> {
        self.range(&[], None)
    }

    /// Decodes entry `idx`, validating it lies inside the entry region.
    fn entry_at(&self, idx: u64) -> TableResult<(&[u8], u64)> {
        let data = &self.mmap[..];
        let slot = self.offset_table_pos + idx as usize * OFFSET_WIDTH;
        let offset = read_u64(data, slot);
        let limit = self.offset_table_pos as u64;

        if offset < HEADER_LEN as u64 || offset.saturating_add(ENTRY_OVERHEAD as u64) > limit {
            return Err(TableError::corruption(
                format!("entry {} has out-of-bounds offset {}", idx, offset),
                &self.path,
            ));
        }
        let start = offset as usize;
        let key_len = read_u16(data, start) as usize;
        let key_start = start + 2;
        let value_start = key_start + key_len;
        if (value_start + 8) as u64 > limit {
            return Err(TableError::corruption(
                format!("entry {} with key length {} overruns entry region", idx, key_len),
                &self.path,
            ));
        }
        Ok((&data[key_start..value_start], read_u64(data, value_start)))
    }

    /// Index of the first entry whose key is `>= key`.
    fn lower_bound(&self, key: &[u8]) -> TableResult<u64> {
        let mut lo = 0u64;
        let mut hi = self.entry_count;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let (mid_key, _) = self.entry_at(mid)?;
            if mid_key < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }
}

impl OrderedIndex for SortedTable {
    type Range<'a> = SortedRange<'a>;

    fn get(&self, key: &[u8]) -> TableResult<Option<u64>> {
        let idx = self.lower_bound(key)?;
        if idx >= self.entry_count {
            return Ok(None);
        }
        let (found, value) = self.entry_at(idx)?;
        Ok((found == key).then_some(value))
    }

    fn range<'a>(&'a self, lower: &[u8], upper: Option<&[u8]>) -> SortedRange<'a> {
        let (next, state) = match self.lower_bound(lower) {
            Ok(idx) => (idx, CursorState::Active),
            Err(e) => (0, CursorState::Failed(Some(e))),
        };
        SortedRange {
            table: self,
            next,
            upper: upper.map(<[u8]>::to_vec),
            state,
        }
    }

    fn len(&self) -> u64 {
        self.entry_count
    }
}

enum CursorState {
    Active,
    /// Holds the failure until it is reported once
    Failed(Option<TableError>),
    Exhausted,
}

/// Forward cursor over `lower <= key < upper`.
///
/// Yields `Some(Ok(entry))` per entry, `None` on exhaustion, and
/// `Some(Err(_))` once if the table turns out unreadable, after which it is
/// fused. Take a fresh cursor to rescan.
pub struct SortedRange<'a> {
    table: &'a SortedTable,
    next: u64,
    upper: Option<Vec<u8>>,
    state: CursorState,
}

impl<'a> Iterator for SortedRange<'a> {
    type Item = TableResult<(&'a [u8], u64)>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            CursorState::Exhausted => return None,
            CursorState::Failed(ref mut pending) => {
                let err = pending.take()?;
                return Some(Err(TableError::range_scan(err.message(), &self.table.path)));
            }
            CursorState::Active => {}
        }

        if self.next >= self.table.entry_count {
            self.state = CursorState::Exhausted;
            return None;
        }

        let table: &'a SortedTable = self.table;
        match table.entry_at(self.next) {
            Ok((key, value)) => {
                if let Some(ref upper) = self.upper {
                    if key >= upper.as_slice() {
                        self.state = CursorState::Exhausted;
                        return None;
                    }
                }
                self.next += 1;
                Some(Ok((key, value)))
            }
            Err(e) => {
                self.state = CursorState::Failed(None);
                Some(Err(TableError::range_scan(
                    format!("cursor failed at entry {}: {}", self.next, e.message()),
                    &table.path,
                )))
            }
        }
    }
}
