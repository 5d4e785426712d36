use serde::{Deserialize, Serialize};

use super::{
    check_columns, optional_number, optional_text, required_text, RecordError, RecordResult,
};

/// A single alternate name.
///
/// A title has zero or more AKA ("also known as") records, all sharing the
/// title's identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aka {
    /// Title identifier these names describe
    pub id: String,
    /// Preference order among this title's names
    pub order: Option<i32>,
    /// The alternate name
    pub title: String,
    pub region: Option<String>,
    pub language: Option<String>,
    /// Comma separated name types
    pub types: Option<String>,
    /// Comma separated name attributes
    pub attributes: Option<String>,
    pub is_original_title: Option<bool>,
}

impl Aka {
    /// Parses a `title.akas.tsv` row: `titleId, ordering, title, region,
    /// language, types, attributes, isOriginalTitle`. Missing trailing
    /// columns read as absent.
    pub fn from_fields(fields: &[&str]) -> RecordResult<Self> {
        check_columns(fields, 3)?;
        Ok(Self {
            id: required_text(fields, 0, "titleId")?,
            order: optional_number(fields, 1, "ordering")?,
            title: required_text(fields, 2, "title")?,
            region: optional_text(fields, 3),
            language: optional_text(fields, 4),
            types: optional_text(fields, 5),
            attributes: optional_text(fields, 6),
            is_original_title: parse_flag(fields, 7, "isOriginalTitle")?,
        })
    }
}

fn parse_flag(fields: &[&str], idx: usize, field: &'static str) -> RecordResult<Option<bool>> {
    match optional_text(fields, idx).as_deref() {
        None => Ok(None),
        Some("0") => Ok(Some(false)),
        Some("1") => Ok(Some(true)),
        Some(other) => Err(RecordError::InvalidFlag {
            field,
            value: other.to_string(),
        }),
    }
}
