//! Streaming builder for sorted tables
//!
//! Keys must arrive strictly increasing. The output bytes depend only on the
//! inserted entries, so identical input produces identical files.

use std::io::Write;
use std::path::{Path, PathBuf};

use crc32fast::Hasher;

use super::errors::{TableError, TableResult};
use super::format::{encode_header, Footer, HEADER_LEN};
use super::publish::{AtomicFile, SealedFile};
use super::IndexBuilder;

/// Summary of a sealed table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedTable {
    pub path: PathBuf,
    pub entry_count: u64,
    pub file_len: u64,
    pub checksum: u32,
}

/// Writes a sorted table to a temp file. `finish` publishes it; `seal`
/// stages it for a later publish.
pub struct SortedTableBuilder {
    out: AtomicFile,
    hasher: Hasher,
    offsets: Vec<u64>,
    position: u64,
    last_key: Option<Vec<u8>>,
}

impl SortedTableBuilder {
    /// Starts a table that will be published at `path`.
    pub fn create(path: &Path) -> TableResult<Self> {
        let out = AtomicFile::create(path)
            .map_err(|e| TableError::write_failed("failed to create temp table file", path, e))?;

        let mut builder = Self {
            out,
            hasher: Hasher::new(),
            offsets: Vec::new(),
            position: 0,
            last_key: None,
        };
        builder.write_hashed(&encode_header())?;
        debug_assert_eq!(builder.position, HEADER_LEN as u64);
        Ok(builder)
    }

    /// Destination path of this table
    pub fn path(&self) -> &Path {
        self.out.final_path()
    }

    /// Entries inserted so far
    pub fn len(&self) -> u64 {
        self.offsets.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Writes the offset table and footer and syncs the temp file. Nothing
    /// is visible at the final path until the result is published.
    pub fn seal(mut self) -> TableResult<StagedTable> {
        let offset_table_pos = self.position;
        let offsets = std::mem::take(&mut self.offsets);
        for offset in &offsets {
            self.write_hashed(&offset.to_le_bytes())?;
        }

        let footer = Footer {
            entry_count: offsets.len() as u64,
            offset_table_pos,
            checksum: std::mem::take(&mut self.hasher).finalize(),
        };
        let path = self.out.final_path().to_path_buf();
        let footer_bytes = footer.encode();
        self.out
            .write_all(&footer_bytes)
            .map_err(|e| TableError::write_failed("failed to write table footer", &path, e))?;
        let file_len = self.position + footer_bytes.len() as u64;

        let file = self
            .out
            .seal()
            .map_err(|e| TableError::write_failed("failed to sync table", &path, e))?;

        Ok(StagedTable {
            summary: SealedTable {
                path,
                entry_count: footer.entry_count,
                file_len,
                checksum: footer.checksum,
            },
            file,
        })
    }

    fn write_hashed(&mut self, bytes: &[u8]) -> TableResult<()> {
        let path = self.out.final_path().to_path_buf();
        self.out
            .write_all(bytes)
            .map_err(|e| TableError::write_failed("failed to write table", &path, e))?;
        self.hasher.update(bytes);
        self.position += bytes.len() as u64;
        Ok(())
    }
}

/// A complete table under its temp name, awaiting publication.
#[derive(Debug)]
pub struct StagedTable {
    summary: SealedTable,
    file: SealedFile,
}

impl StagedTable {
    pub fn summary(&self) -> &SealedTable {
        &self.summary
    }

    /// Renames the table into place.
    pub fn publish(self) -> TableResult<SealedTable> {
        let path = self.summary.path.clone();
        self.file
            .publish()
            .map_err(|e| TableError::write_failed("failed to publish table", &path, e))?;
        Ok(self.summary)
    }

    /// Splits into the summary and the sealed file, for callers that
    /// publish several files together.
    pub fn into_parts(self) -> (SealedTable, SealedFile) {
        (self.summary, self.file)
    }
}

impl IndexBuilder for SortedTableBuilder {
    type Output = SealedTable;

    fn insert(&mut self, key: &[u8], value: u64) -> TableResult<()> {
        let key_len = u16::try_from(key.len()).map_err(|_| TableError::key_too_long(key.len()))?;

        if let Some(ref last) = self.last_key {
            if key <= last.as_slice() {
                return Err(TableError::out_of_order(last, key));
            }
        }

        self.offsets.push(self.position);
        self.write_hashed(&key_len.to_le_bytes())?;
        self.write_hashed(key)?;
        self.write_hashed(&value.to_le_bytes())?;

        let last = self.last_key.get_or_insert_with(Vec::new);
        last.clear();
        last.extend_from_slice(key);
        Ok(())
    }

    fn finish(self) -> TableResult<SealedTable> {
        self.seal()?.publish()
    }
}
