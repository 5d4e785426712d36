//! Memory-mapped TSV input
//!
//! Rows are newline-terminated; a trailing `\r` is not part of the row and
//! the last row may lack its newline. Offsets are byte positions of each
//! row's first byte in the mapped file.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::errors::{IndexError, IndexResult};

/// A normalized, header-first TSV file mapped read-only.
pub struct TsvSource {
    path: PathBuf,
    // Zero-length files are not mapped
    mmap: Option<Mmap>,
}

impl TsvSource {
    /// Maps the file at `path`.
    pub fn open(path: &Path) -> IndexResult<Self> {
        let file = File::open(path)
            .map_err(|e| IndexError::build_io("failed to open source file", path, e))?;
        let len = file
            .metadata()
            .map_err(|e| IndexError::build_io("failed to stat source file", path, e))?
            .len();
        let mmap = if len == 0 {
            None
        } else {
            // Source files are inputs of a build and are not modified during it.
            Some(
                unsafe { Mmap::map(&file) }
                    .map_err(|e| IndexError::build_io("failed to map source file", path, e))?,
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

    /// Raw bytes of the whole file
    pub fn bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    /// The header row, without its line terminator. Empty for an empty file.
    pub fn header(&self) -> &[u8] {
        match split_line(self.bytes(), 0) {
            Some((line, _)) => line,
            None => &[],
        }
    }

    /// Every row after the header.
    pub fn rows(&self) -> TsvRows<'_> {
        let data = self.bytes();
        let start = split_line(data, 0).map_or(data.len(), |(_, next)| next);
        TsvRows { data, pos: start }
    }
}

/// One data row of a [`TsvSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TsvRow<'a> {
    /// Byte offset of the row's first byte
    pub offset: u64,
    /// Row bytes without the line terminator
    pub line: &'a [u8],
}

/// Iterator over the data rows of a source.
pub struct TsvRows<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for TsvRows<'a> {
    type Item = TsvRow<'a>;

    fn next(&mut self) -> Option<TsvRow<'a>> {
        let offset = self.pos;
        let (line, next) = split_line(self.data, offset)?;
        self.pos = next;
        Some(TsvRow {
            offset: offset as u64,
            line,
        })
    }
}

/// Splits the line starting at `pos`, returning it (without `\n` or
/// `\r\n`) and the position of the next line. `None` at end of data.
pub(crate) fn split_line(data: &[u8], pos: usize) -> Option<(&[u8], usize)> {
    if pos >= data.len() {
        return None;
    }
    let rest = &data[pos..];
    let (raw, next) = match rest.iter().position(|&b| b == b'\n') {
        Some(nl) => (&rest[..nl], pos + nl + 1),
        None => (rest, data.len()),
    };
    let line = raw.strip_suffix(b"\r").unwrap_or(raw);
    Some((line, next))
}
