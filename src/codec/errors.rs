//! Key codec errors

use thiserror::Error;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while encoding or decoding composite keys
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A NUL byte inside an identifier would be read back as the delimiter
    #[error("field '{field}' contains an embedded NUL byte")]
    EmbeddedNul { field: String },

    /// A present value equals the all-ones "absent" sentinel
    #[error("field '{field}' holds a value equal to the absent sentinel")]
    SentinelCollision { field: String },

    #[error("key truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("key has no NUL delimiter after its leading identifier")]
    MissingDelimiter,

    #[error("key text is not valid UTF-8")]
    InvalidUtf8,

    /// Aka payload does not fit the 16/48 bit split
    #[error("aka payload overflow: count {count}, offset {offset}")]
    PayloadOverflow { count: u64, offset: u64 },
}
