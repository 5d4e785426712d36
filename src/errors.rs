//! Index error types
//!
//! Error codes:
//! - IMDB_MALFORMED_RECORD (ERROR) - source row skipped during build
//! - IMDB_ENCODING_VIOLATION (ERROR) - identifier cannot be encoded into a key
//! - IMDB_BUILD_IO_FAILED (FATAL) - index file cannot be created, written or sealed
//! - IMDB_OPEN_FAILED (ERROR) - index file missing or unreadable
//! - IMDB_INDEX_CORRUPTION (FATAL) - sealed file fails structural validation
//! - IMDB_RANGE_SCAN_FAILED (ERROR) - cursor failed before exhaustion
//! - IMDB_BACKING_STORE_DESYNC (FATAL) - index and backing file are not a pair
//! - IMDB_CONFIG_INVALID (FATAL) - configuration rejected
//!
//! "Not found" is not an error: lookups return `Option` or an empty `Vec`.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::codec::CodecError;
use crate::records::RecordError;
use crate::table::{TableError, TableErrorCode};

/// Severity levels for index errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, caller may continue
    Error,
    /// The index (or index pair) cannot be trusted
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Index error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexErrorCode {
    /// A source row's required field failed to parse
    MalformedRecord,
    /// An identifier contains a forbidden byte or a value collides with a sentinel
    EncodingViolation,
    /// Index file could not be created, written or sealed
    BuildIoFailed,
    /// Index file could not be opened
    OpenFailed,
    /// Index file failed structural validation
    IndexCorruption,
    /// Range cursor failed mid-scan
    RangeScanFailed,
    /// Offset resolved to data inconsistent with the index
    BackingStoreDesync,
    /// Configuration rejected
    ConfigInvalid,
}

impl IndexErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            IndexErrorCode::MalformedRecord => "IMDB_MALFORMED_RECORD",
            IndexErrorCode::EncodingViolation => "IMDB_ENCODING_VIOLATION",
            IndexErrorCode::BuildIoFailed => "IMDB_BUILD_IO_FAILED",
            IndexErrorCode::OpenFailed => "IMDB_OPEN_FAILED",
            IndexErrorCode::IndexCorruption => "IMDB_INDEX_CORRUPTION",
            IndexErrorCode::RangeScanFailed => "IMDB_RANGE_SCAN_FAILED",
            IndexErrorCode::BackingStoreDesync => "IMDB_BACKING_STORE_DESYNC",
            IndexErrorCode::ConfigInvalid => "IMDB_CONFIG_INVALID",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            IndexErrorCode::MalformedRecord => Severity::Error,
            IndexErrorCode::EncodingViolation => Severity::Error,
            IndexErrorCode::BuildIoFailed => Severity::Fatal,
            IndexErrorCode::OpenFailed => Severity::Error,
            IndexErrorCode::IndexCorruption => Severity::Fatal,
            IndexErrorCode::RangeScanFailed => Severity::Error,
            IndexErrorCode::BackingStoreDesync => Severity::Fatal,
            IndexErrorCode::ConfigInvalid => Severity::Fatal,
        }
    }
}

impl fmt::Display for IndexErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Index error type with full context
#[derive(Debug)]
pub struct IndexError {
    /// Error code
    code: IndexErrorCode,
    /// Human-readable message
    message: String,
    /// File the error relates to, if any
    path: Option<PathBuf>,
    /// Underlying IO error if applicable
    source: Option<io::Error>,
}

impl IndexError {
    /// Create an error with the given code
    pub fn new(code: IndexErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
            source: None,
        }
    }

    /// Create a malformed record error
    pub fn malformed_record(message: impl Into<String>) -> Self {
        Self::new(IndexErrorCode::MalformedRecord, message)
    }

    /// Create an encoding violation error
    pub fn encoding_violation(message: impl Into<String>) -> Self {
        Self::new(IndexErrorCode::EncodingViolation, message)
    }

    /// Create a build I/O failure
    pub fn build_io(message: impl Into<String>, path: &Path, source: io::Error) -> Self {
        Self {
            code: IndexErrorCode::BuildIoFailed,
            message: message.into(),
            path: Some(path.to_path_buf()),
            source: Some(source),
        }
    }

    /// Create a build failure without an I/O source
    pub fn build_failed(message: impl Into<String>) -> Self {
        Self::new(IndexErrorCode::BuildIoFailed, message)
    }

    /// Create an open failure
    pub fn open_failed(message: impl Into<String>, path: &Path, source: io::Error) -> Self {
        Self {
            code: IndexErrorCode::OpenFailed,
            message: message.into(),
            path: Some(path.to_path_buf()),
            source: Some(source),
        }
    }

    /// Create a backing store desync error
    pub fn backing_desync(message: impl Into<String>) -> Self {
        Self::new(IndexErrorCode::BackingStoreDesync, message)
    }

    /// Create a configuration error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(IndexErrorCode::ConfigInvalid, message)
    }

    /// Attach the file this error relates to
    pub fn with_path(mut self, path: &Path) -> Self {
        self.path = Some(path.to_path_buf());
        self
    }

    /// Returns the error code
    pub fn code(&self) -> IndexErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the related file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)?;
        if let Some(ref path) = self.path {
            write!(f, " (file: {})", path.display())?;
        }
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for IndexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<CodecError> for IndexError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::PayloadOverflow { .. } => IndexError::build_failed(e.to_string()),
            CodecError::Truncated { .. }
            | CodecError::MissingDelimiter
            | CodecError::InvalidUtf8 => {
                IndexError::new(IndexErrorCode::IndexCorruption, format!("undecodable key: {}", e))
            }
            CodecError::EmbeddedNul { .. } | CodecError::SentinelCollision { .. } => {
                IndexError::encoding_violation(e.to_string())
            }
        }
    }
}

impl From<RecordError> for IndexError {
    fn from(e: RecordError) -> Self {
        IndexError::malformed_record(e.to_string())
    }
}

impl From<TableError> for IndexError {
    fn from(e: TableError) -> Self {
        let code = match e.code() {
            TableErrorCode::WriteFailed
            | TableErrorCode::OutOfOrder
            | TableErrorCode::KeyTooLong => IndexErrorCode::BuildIoFailed,
            TableErrorCode::OpenFailed => IndexErrorCode::OpenFailed,
            TableErrorCode::Corruption => IndexErrorCode::IndexCorruption,
            TableErrorCode::RangeScan => IndexErrorCode::RangeScanFailed,
        };
        let path = e.path().map(Path::to_path_buf);
        let message = e.message().to_string();
        Self {
            code,
            message,
            path,
            source: e.into_io_source(),
        }
    }
}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;
