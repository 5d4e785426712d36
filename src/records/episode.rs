use serde::{Deserialize, Serialize};

use super::{check_columns, optional_number, required_text, RecordResult};

/// A single episode record.
///
/// Joins an episode title to its parent TV show title, with the season
/// and episode numbers when the dataset knows them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    /// Title identifier of this episode
    pub id: String,
    /// Title identifier of the parent show
    pub show_id: String,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl Episode {
    /// Parses a `title.episode.tsv` row:
    /// `tconst, parentTconst, seasonNumber, episodeNumber`.
    pub fn from_fields(fields: &[&str]) -> RecordResult<Self> {
        check_columns(fields, 2)?;
        Ok(Self {
            id: required_text(fields, 0, "tconst")?,
            show_id: required_text(fields, 1, "parentTconst")?,
            season: optional_number(fields, 2, "seasonNumber")?,
            episode: optional_number(fields, 3, "episodeNumber")?,
        })
    }
}
