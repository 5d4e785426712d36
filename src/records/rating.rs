use serde::{Deserialize, Serialize};

use super::{check_columns, required_number, required_text, RecordError, RecordResult};

/// Upper end of the IMDb rating scale
pub const MAX_RATING: f32 = 10.0;

/// A rating associated with a single title record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    /// Title identifier this rating describes
    pub id: String,
    /// Weighted average on a 0 to 10 scale
    pub rating: f32,
    /// Number of votes behind the rating
    pub votes: u32,
}

impl Rating {
    /// Parses a `title.ratings.tsv` row: `tconst, averageRating, numVotes`.
    pub fn from_fields(fields: &[&str]) -> RecordResult<Self> {
        check_columns(fields, 3)?;
        let rating: f32 = required_number(fields, 1, "averageRating")?;
        if !(0.0..=MAX_RATING).contains(&rating) {
            return Err(RecordError::OutOfRange {
                field: "averageRating",
                value: fields[1].to_string(),
            });
        }
        Ok(Self {
            id: required_text(fields, 0, "tconst")?,
            rating,
            votes: required_number(fields, 2, "numVotes")?,
        })
    }
}
