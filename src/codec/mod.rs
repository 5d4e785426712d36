//! Composite key codec
//!
//! Pure, order-preserving encodings between domain field tuples and index
//! keys. Byte-lexicographic order of encoded keys equals the intended
//! multi-field order of the tuples.

mod errors;
mod key;
mod layouts;

pub use errors::{CodecError, CodecResult};
pub use key::{prefix_upper_bound, KeyBuilder, KeyReader, ABSENT_U32, DELIMITER};
pub use layouts::{
    aka_key, decode_episode_major, decode_rating, decode_show_major, episode_major_key,
    id_prefix, pack_aka_payload, rating_key, season_prefix, show_major_key,
    unpack_aka_payload, AkaPayload, MAX_AKA_COUNT, MAX_AKA_OFFSET,
};
