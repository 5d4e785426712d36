//! Per-domain key layouts
//!
//! | index            | key                                                   |
//! |------------------|-------------------------------------------------------|
//! | episode by show  | show_id 0x00 season(opt) episode(opt) episode_id      |
//! | episode by id    | episode_id 0x00 season(opt) episode(opt) show_id      |
//! | rating           | id 0x00 rating(f32) votes(u32)                        |
//! | aka              | id                                                    |

use crate::records::{Episode, Rating};

use super::errors::{CodecError, CodecResult};
use super::key::{KeyBuilder, KeyReader};

/// Largest row count an aka payload can carry (high 16 bits)
pub const MAX_AKA_COUNT: u64 = (1 << 16) - 1;

/// Largest byte offset an aka payload can carry (low 48 bits)
pub const MAX_AKA_OFFSET: u64 = (1 << 48) - 1;

/// Show-major episode key.
pub fn show_major_key(ep: &Episode) -> CodecResult<Vec<u8>> {
    let mut key = KeyBuilder::with_capacity(ep.show_id.len() + ep.id.len() + 9);
    key.id("show_id", &ep.show_id)?
        .opt_u32("season", ep.season)?
        .opt_u32("episode", ep.episode)?
        .tail("episode_id", &ep.id)?;
    Ok(key.finish())
}

pub fn decode_show_major(key: &[u8]) -> CodecResult<Episode> {
    let mut reader = KeyReader::new(key);
    let show_id = reader.id()?.to_string();
    let season = reader.opt_u32()?;
    let episode = reader.opt_u32()?;
    let id = reader.tail()?.to_string();
    Ok(Episode {
        id,
        show_id,
        season,
        episode,
    })
}

/// Episode-major episode key.
pub fn episode_major_key(ep: &Episode) -> CodecResult<Vec<u8>> {
    let mut key = KeyBuilder::with_capacity(ep.show_id.len() + ep.id.len() + 9);
    key.id("episode_id", &ep.id)?
        .opt_u32("season", ep.season)?
        .opt_u32("episode", ep.episode)?
        .tail("show_id", &ep.show_id)?;
    Ok(key.finish())
}

pub fn decode_episode_major(key: &[u8]) -> CodecResult<Episode> {
    let mut reader = KeyReader::new(key);
    let id = reader.id()?.to_string();
    let season = reader.opt_u32()?;
    let episode = reader.opt_u32()?;
    let show_id = reader.tail()?.to_string();
    Ok(Episode {
        id,
        show_id,
        season,
        episode,
    })
}

/// Rating key. All of the record lives in the key.
pub fn rating_key(rating: &Rating) -> CodecResult<Vec<u8>> {
    let mut key = KeyBuilder::with_capacity(rating.id.len() + 9);
    key.id("id", &rating.id)?
        .f32_be(rating.rating)
        .u32_be(rating.votes);
    Ok(key.finish())
}

pub fn decode_rating(key: &[u8]) -> CodecResult<Rating> {
    let mut reader = KeyReader::new(key);
    let id = reader.id()?.to_string();
    let rating = reader.f32_be()?;
    let votes = reader.u32_be()?;
    Ok(Rating { id, rating, votes })
}

/// Aka key: the bare identifier.
pub fn aka_key(id: &str) -> CodecResult<Vec<u8>> {
    let mut key = KeyBuilder::with_capacity(id.len());
    key.tail("id", id)?;
    Ok(key.finish())
}

/// Prefix shared by every key whose leading identifier is `id`.
pub fn id_prefix(id: &str) -> CodecResult<Vec<u8>> {
    let mut key = KeyBuilder::with_capacity(id.len() + 1);
    key.id("id", id)?;
    Ok(key.finish())
}

/// Prefix shared by every show-major key of one season of one show.
pub fn season_prefix(show_id: &str, season: u32) -> CodecResult<Vec<u8>> {
    let mut key = KeyBuilder::with_capacity(show_id.len() + 5);
    key.id("show_id", show_id)?.opt_u32("season", Some(season))?;
    Ok(key.finish())
}

/// Location of an identifier's contiguous rows in the aka backing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AkaPayload {
    /// Number of rows sharing the identifier
    pub count: u16,
    /// Byte offset of the first row
    pub offset: u64,
}

/// Packs count (high 16 bits) and offset (low 48 bits).
pub fn pack_aka_payload(count: u64, offset: u64) -> CodecResult<u64> {
    if count == 0 || count > MAX_AKA_COUNT || offset > MAX_AKA_OFFSET {
        return Err(CodecError::PayloadOverflow { count, offset });
    }
    Ok((count << 48) | offset)
}

pub fn unpack_aka_payload(value: u64) -> AkaPayload {
    AkaPayload {
        count: (value >> 48) as u16,
        offset: value & MAX_AKA_OFFSET,
    }
}
