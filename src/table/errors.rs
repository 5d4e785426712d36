//! Ordered index engine errors
//!
//! Error codes:
//! - IMDB_TABLE_WRITE_FAILED - temp file cannot be written, synced or renamed
//! - IMDB_TABLE_OUT_OF_ORDER - builder received a non-increasing key
//! - IMDB_TABLE_KEY_TOO_LONG - key exceeds the 16-bit length field
//! - IMDB_TABLE_OPEN_FAILED - sealed file cannot be opened or mapped
//! - IMDB_TABLE_CORRUPTION - header, footer or entry bounds are invalid
//! - IMDB_TABLE_RANGE_SCAN - cursor hit unreadable data before exhaustion

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Engine error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableErrorCode {
    WriteFailed,
    /// Builder contract violated; a correct sort never triggers this
    OutOfOrder,
    KeyTooLong,
    OpenFailed,
    Corruption,
    RangeScan,
}

impl TableErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            TableErrorCode::WriteFailed => "IMDB_TABLE_WRITE_FAILED",
            TableErrorCode::OutOfOrder => "IMDB_TABLE_OUT_OF_ORDER",
            TableErrorCode::KeyTooLong => "IMDB_TABLE_KEY_TOO_LONG",
            TableErrorCode::OpenFailed => "IMDB_TABLE_OPEN_FAILED",
            TableErrorCode::Corruption => "IMDB_TABLE_CORRUPTION",
            TableErrorCode::RangeScan => "IMDB_TABLE_RANGE_SCAN",
        }
    }
}

impl fmt::Display for TableErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Engine error with context
#[derive(Debug)]
pub struct TableError {
    code: TableErrorCode,
    message: String,
    path: Option<PathBuf>,
    source: Option<io::Error>,
}

impl TableError {
    fn new(code: TableErrorCode, message: impl Into<String>, path: Option<&Path>) -> Self {
        Self {
            code,
            message: message.into(),
            path: path.map(Path::to_path_buf),
            source: None,
        }
    }

    /// Create a write failure
    pub fn write_failed(message: impl Into<String>, path: &Path, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::new(TableErrorCode::WriteFailed, message, Some(path))
        }
    }

    /// Create an out-of-order insertion error
    pub fn out_of_order(previous: &[u8], key: &[u8]) -> Self {
        Self::new(
            TableErrorCode::OutOfOrder,
            format!(
                "key {} inserted after {}; keys must be strictly increasing",
                String::from_utf8_lossy(key).escape_debug(),
                String::from_utf8_lossy(previous).escape_debug()
            ),
            None,
        )
    }

    /// Create a key length error
    pub fn key_too_long(len: usize) -> Self {
        Self::new(
            TableErrorCode::KeyTooLong,
            format!("key of {} bytes exceeds the {} byte limit", len, u16::MAX),
            None,
        )
    }

    /// Create an open failure
    pub fn open_failed(message: impl Into<String>, path: &Path, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::new(TableErrorCode::OpenFailed, message, Some(path))
        }
    }

    /// Create a corruption error
    pub fn corruption(message: impl Into<String>, path: &Path) -> Self {
        Self::new(TableErrorCode::Corruption, message, Some(path))
    }

    /// Create a mid-scan failure
    pub fn range_scan(message: impl Into<String>, path: &Path) -> Self {
        Self::new(TableErrorCode::RangeScan, message, Some(path))
    }

    /// Returns the error code
    pub fn code(&self) -> TableErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the related file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Consumes the error, returning the underlying I/O error
    pub fn into_io_source(self) -> Option<io::Error> {
        self.source
    }
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(ref path) = self.path {
            write!(f, " (file: {})", path.display())?;
        }
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for TableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for engine operations
pub type TableResult<T> = Result<T, TableError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_order_message() {
        let err = TableError::out_of_order(b"tt2", b"tt1");
        assert_eq!(err.code(), TableErrorCode::OutOfOrder);
        assert!(err.message().contains("tt1"));
        assert!(err.message().contains("tt2"));
    }

    #[test]
    fn test_display_includes_code_and_path() {
        let err = TableError::corruption("bad magic", Path::new("/idx/ratings.idx"));
        let display = format!("{}", err);
        assert!(display.starts_with("IMDB_TABLE_CORRUPTION"));
        assert!(display.contains("/idx/ratings.idx"));
    }
}
