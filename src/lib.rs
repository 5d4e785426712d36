//! imdb-index - compact, sorted, memory-mapped indexes over the IMDb
//! title datasets
//!
//! Layers, bottom-up:
//! - `codec`: order-preserving composite keys
//! - `records`: typed rows of `title.akas`, `title.episode`, `title.ratings`
//! - `table`: the ordered index boundary, a sealed on-disk table and an
//!   in-memory map behind the same traits
//! - `pipeline`: source scanning, reject accounting, sort and feed
//! - `backing`: offset resolution into companion row files
//! - `domain`: per-dataset build, open and query facades
//! - `catalog`: configuration and the concurrent build of all domains

pub mod backing;
pub mod catalog;
pub mod cli;
pub mod codec;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod pipeline;
pub mod records;
pub mod table;

pub use catalog::{Catalog, IndexConfig};
pub use domain::{AkaIndex, BuildOptions, EpisodeIndex, OpenOptions, RatingIndex};
pub use errors::{IndexError, IndexErrorCode, IndexResult};
pub use records::{Aka, Episode, Rating};
