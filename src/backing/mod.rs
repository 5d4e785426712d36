//! Backing-store resolver
//!
//! Turns an index hit into full rows. Domains whose records fit entirely in
//! the key resolve by decoding ([`ResolvePolicy::KeyEmbedded`]); the rest
//! store a byte offset into a companion TSV file and resolve by reading
//! rows from it ([`ResolvePolicy::OffsetSeek`]).
//!
//! An offset that does not land on a row of the companion file means the
//! index and the file were not produced by the same build. That is reported
//! as `IMDB_BACKING_STORE_DESYNC`, never as "not found".

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use crc32fast::Hasher;
use memmap2::Mmap;
use serde::{Deserialize, Serialize};

use crate::errors::{IndexError, IndexResult};
use crate::pipeline::split_line;

/// How a domain turns an index hit into a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvePolicy {
    /// Every field lives in the key; resolving is decoding
    KeyEmbedded,
    /// The payload addresses rows in a companion file
    OffsetSeek,
}

impl ResolvePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolvePolicy::KeyEmbedded => "key_embedded",
            ResolvePolicy::OffsetSeek => "offset_seek",
        }
    }
}

impl fmt::Display for ResolvePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A memory-mapped companion data file.
pub struct BackingStore {
    path: PathBuf,
    mmap: Option<Mmap>,
}

impl BackingStore {
    pub fn open(path: &Path) -> IndexResult<Self> {
        let file = File::open(path)
            .map_err(|e| IndexError::open_failed("failed to open backing file", path, e))?;
        let len = file
            .metadata()
            .map_err(|e| IndexError::open_failed("failed to stat backing file", path, e))?
            .len();
        let mmap = if len == 0 {
            None
        } else {
            // Published backing files are replaced by rename, never rewritten.
            Some(
                unsafe { Mmap::map(&file) }
                    .map_err(|e| IndexError::open_failed("failed to map backing file", path, e))?,
            )
        };
        Ok(Self {
            path: path.to_path_buf(),
            mmap,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    pub fn len(&self) -> u64 {
        self.bytes().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    /// crc32 of the whole file
    pub fn checksum(&self) -> u32 {
        let mut hasher = Hasher::new();
        hasher.update(self.bytes());
        hasher.finalize()
    }

    /// Reads exactly `count` rows starting at the row that begins at
    /// `offset`.
    pub fn rows_at(&self, offset: u64, count: usize) -> IndexResult<Vec<&[u8]>> {
        let data = self.bytes();
        let start = usize::try_from(offset)
            .ok()
            .filter(|&start| start < data.len())
            .ok_or_else(|| {
                self.desync(format!(
                    "offset {} is beyond the end of a {} byte file",
                    offset,
                    data.len()
                ))
            })?;
        if start > 0 && data[start - 1] != b'\n' {
            return Err(self.desync(format!("offset {} is not at the start of a row", offset)));
        }

        let mut rows = Vec::with_capacity(count);
        let mut pos = start;
        while rows.len() < count {
            let (line, next) = split_line(data, pos).ok_or_else(|| {
                self.desync(format!(
                    "expected {} rows at offset {}, file ends after {}",
                    count,
                    offset,
                    rows.len()
                ))
            })?;
            rows.push(line);
            pos = next;
        }
        Ok(rows)
    }

    pub(crate) fn desync(&self, message: String) -> IndexError {
        IndexError::backing_desync(message).with_path(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::IndexErrorCode;
    use std::fs;
    use tempfile::TempDir;

    fn store(contents: &str) -> (TempDir, BackingStore) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("akas.tsv");
        fs::write(&path, contents).unwrap();
        let store = BackingStore::open(&path).unwrap();
        (tmp, store)
    }

    #[test]
    fn test_rows_at_reads_exact_count() {
        let (_tmp, store) = store("h\ntt1\ta\ntt1\tb\ntt2\tc\n");
        let rows = store.rows_at(2, 2).unwrap();
        assert_eq!(rows, vec![&b"tt1\ta"[..], &b"tt1\tb"[..]]);

        let rows = store.rows_at(14, 1).unwrap();
        assert_eq!(rows, vec![&b"tt2\tc"[..]]);
    }

    #[test]
    fn test_offset_past_end_is_desync() {
        let (_tmp, store) = store("h\ntt1\ta\n");
        let err = store.rows_at(500, 1).unwrap_err();
        assert_eq!(err.code(), IndexErrorCode::BackingStoreDesync);
        assert_eq!(store.rows_at(8, 1).unwrap_err().code(), IndexErrorCode::BackingStoreDesync);
    }

    #[test]
    fn test_short_file_is_desync() {
        let (_tmp, store) = store("h\ntt1\ta\ntt1\tb");
        assert_eq!(store.rows_at(2, 2).unwrap().len(), 2);
        let err = store.rows_at(2, 3).unwrap_err();
        assert_eq!(err.code(), IndexErrorCode::BackingStoreDesync);
        assert!(err.message().contains("expected 3 rows"));
    }

    #[test]
    fn test_mid_row_offset_is_desync() {
        let (_tmp, store) = store("h\ntt1\ta\n");
        let err = store.rows_at(3, 1).unwrap_err();
        assert_eq!(err.code(), IndexErrorCode::BackingStoreDesync);
    }

    #[test]
    fn test_policy_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ResolvePolicy::OffsetSeek).unwrap(),
            "\"offset_seek\""
        );
        assert_eq!(ResolvePolicy::KeyEmbedded.to_string(), "key_embedded");
    }
}
