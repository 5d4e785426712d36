//! Order-preserving composite key builder and reader
//!
//! Field encodings:
//! - identifier: verbatim bytes, NUL-free, followed by a 0x00 delimiter when
//!   more fields follow
//! - u32: big-endian, so byte order equals numeric order
//! - optional u32: absent encodes as `0xFFFF_FFFF`, which sorts after every
//!   present value; a present `u32::MAX` is rejected
//! - f32: IEEE bits, big-endian
//! - tail: verbatim bytes consuming the rest of the key

use super::errors::{CodecError, CodecResult};

/// Delimiter between a leading identifier and the fixed-width fields
pub const DELIMITER: u8 = 0x00;

/// Encoding of an absent optional integer
pub const ABSENT_U32: u32 = u32::MAX;

/// Append-only composite key builder.
#[derive(Debug, Default)]
pub struct KeyBuilder {
    buf: Vec<u8>,
}

impl KeyBuilder {
    /// Creates an empty builder
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Creates an empty builder with room for `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Appends an identifier and its trailing delimiter.
    pub fn id(&mut self, field: &str, value: &str) -> CodecResult<&mut Self> {
        check_nul(field, value)?;
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.push(DELIMITER);
        Ok(self)
    }

    /// Appends a big-endian u32.
    pub fn u32_be(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Appends an optional u32, mapping `None` to the absent sentinel.
    pub fn opt_u32(&mut self, field: &str, value: Option<u32>) -> CodecResult<&mut Self> {
        match value {
            Some(ABSENT_U32) => Err(CodecError::SentinelCollision {
                field: field.to_string(),
            }),
            Some(v) => Ok(self.u32_be(v)),
            None => Ok(self.u32_be(ABSENT_U32)),
        }
    }

    /// Appends the IEEE bits of an f32, big-endian.
    pub fn f32_be(&mut self, value: f32) -> &mut Self {
        self.u32_be(value.to_bits())
    }

    /// Appends the final variable-length field.
    pub fn tail(&mut self, field: &str, value: &str) -> CodecResult<&mut Self> {
        check_nul(field, value)?;
        self.buf.extend_from_slice(value.as_bytes());
        Ok(self)
    }

    /// Returns the encoded key
    pub fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

fn check_nul(field: &str, value: &str) -> CodecResult<()> {
    if value.as_bytes().contains(&DELIMITER) {
        return Err(CodecError::EmbeddedNul {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Forward cursor over an encoded key.
#[derive(Debug)]
pub struct KeyReader<'a> {
    key: &'a [u8],
    pos: usize,
}

impl<'a> KeyReader<'a> {
    pub fn new(key: &'a [u8]) -> Self {
        Self { key, pos: 0 }
    }

    /// Reads the leading identifier up to the first NUL and consumes the NUL.
    pub fn id(&mut self) -> CodecResult<&'a str> {
        let rest = &self.key[self.pos..];
        let nul = rest
            .iter()
            .position(|&b| b == DELIMITER)
            .ok_or(CodecError::MissingDelimiter)?;
        let text = std::str::from_utf8(&rest[..nul]).map_err(|_| CodecError::InvalidUtf8)?;
        self.pos += nul + 1;
        Ok(text)
    }

    pub fn u32_be(&mut self) -> CodecResult<u32> {
        let bytes = self.take::<4>()?;
        Ok(u32::from_be_bytes(bytes))
    }

    /// Reads an optional u32; the absent sentinel decodes to `None`.
    pub fn opt_u32(&mut self) -> CodecResult<Option<u32>> {
        let v = self.u32_be()?;
        Ok(if v == ABSENT_U32 { None } else { Some(v) })
    }

    pub fn f32_be(&mut self) -> CodecResult<f32> {
        Ok(f32::from_bits(self.u32_be()?))
    }

    /// Consumes the remaining bytes as text.
    pub fn tail(&mut self) -> CodecResult<&'a str> {
        let rest = &self.key[self.pos..];
        self.pos = self.key.len();
        std::str::from_utf8(rest).map_err(|_| CodecError::InvalidUtf8)
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.key.len() - self.pos
    }

    fn take<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let remaining = self.remaining();
        if remaining < N {
            return Err(CodecError::Truncated {
                needed: N,
                remaining,
            });
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.key[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }
}

/// Returns the smallest byte string greater than every string with `prefix`.
///
/// `None` when the prefix is empty or all `0xFF`, meaning the scan is
/// unbounded above. Unlike appending `0xFF`, this stays correct when a
/// fixed-width field following the prefix starts with `0xFF`.
pub fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.pop() {
        if last < 0xFF {
            upper.push(last + 1);
            return Some(upper);
        }
    }
    None
}
