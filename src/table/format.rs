//! Sorted table file layout
//!
//! ```text
//! +--------------------------------------------+
//! | magic "IMXT" | version u32 | reserved u64  |  header, 16 bytes
//! +--------------------------------------------+
//! | key_len u16 | key | value u64              |  entry, ascending by key
//! | ...                                        |
//! +--------------------------------------------+
//! | entry offset u64                           |  one per entry
//! | ...                                        |
//! +--------------------------------------------+
//! | entry_count u64 | offset_table_pos u64     |
//! | crc32 u32 | version u32 | magic "IMXT"     |  footer, 28 bytes
//! +--------------------------------------------+
//! ```
//!
//! Integers are little-endian. The crc32 covers every byte before the footer.

use std::path::Path;

use super::errors::{TableError, TableResult};

pub const MAGIC: &[u8; 4] = b"IMXT";
pub const VERSION: u32 = 1;
pub const HEADER_LEN: usize = 16;
pub const FOOTER_LEN: usize = 28;
/// key_len + value
pub const ENTRY_OVERHEAD: usize = 2 + 8;
pub const OFFSET_WIDTH: usize = 8;

pub fn encode_header() -> [u8; HEADER_LEN] {
    let mut buf = [0u8; HEADER_LEN];
    buf[0..4].copy_from_slice(MAGIC);
    buf[4..8].copy_from_slice(&VERSION.to_le_bytes());
    buf
}

pub fn check_header(data: &[u8], path: &Path) -> TableResult<()> {
    if data.len() < HEADER_LEN || &data[0..4] != MAGIC {
        return Err(TableError::corruption("missing table header magic", path));
    }
    let version = read_u32(data, 4);
    if version != VERSION {
        return Err(TableError::corruption(
            format!("unsupported table version {}", version),
            path,
        ));
    }
    Ok(())
}

/// Trailing table metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    pub entry_count: u64,
    pub offset_table_pos: u64,
    pub checksum: u32,
}

impl Footer {
    pub fn encode(&self) -> [u8; FOOTER_LEN] {
        let mut buf = [0u8; FOOTER_LEN];
        buf[0..8].copy_from_slice(&self.entry_count.to_le_bytes());
        buf[8..16].copy_from_slice(&self.offset_table_pos.to_le_bytes());
        buf[16..20].copy_from_slice(&self.checksum.to_le_bytes());
        buf[20..24].copy_from_slice(&VERSION.to_le_bytes());
        buf[24..28].copy_from_slice(MAGIC);
        buf
    }

    /// Reads the footer from the end of `data`.
    pub fn decode(data: &[u8], path: &Path) -> TableResult<Self> {
        if data.len() < HEADER_LEN + FOOTER_LEN {
            return Err(TableError::corruption(
                format!("file of {} bytes is too small to be a table", data.len()),
                path,
            ));
        }
        let footer = &data[data.len() - FOOTER_LEN..];
        if &footer[24..28] != MAGIC {
            return Err(TableError::corruption("missing table footer magic", path));
        }
        let version = read_u32(footer, 20);
        if version != VERSION {
            return Err(TableError::corruption(
                format!("footer version {} does not match", version),
                path,
            ));
        }
        Ok(Self {
            entry_count: read_u64(footer, 0),
            offset_table_pos: read_u64(footer, 8),
            checksum: read_u32(footer, 16),
        })
    }
}

/// Reads a little-endian u16. Caller guarantees bounds.
pub fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

/// Reads a little-endian u32. Caller guarantees bounds.
pub fn read_u32(data: &[u8], at: usize) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&data[at..at + 4]);
    u32::from_le_bytes(b)
}

/// Reads a little-endian u64. Caller guarantees bounds.
pub fn read_u64(data: &[u8], at: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&data[at..at + 8]);
    u64::from_le_bytes(b)
}
