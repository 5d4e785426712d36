//! Domain records and TSV row parsing
//!
//! Records mirror the IMDb dataset rows. The dataset writes `\N` for a
//! missing value; optional fields map it to `None`.

mod aka;
mod episode;
mod rating;

pub use aka::Aka;
pub use episode::Episode;
pub use rating::Rating;

use thiserror::Error;

/// Marker the IMDb datasets use for a missing value
pub const NULL_MARKER: &str = "\\N";

/// Result type for row parsing
pub type RecordResult<T> = Result<T, RecordError>;

/// A source row that cannot become a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("row has {found} columns, at least {expected} required")]
    ColumnCount { expected: usize, found: usize },

    #[error("required field '{field}' is empty or null")]
    MissingField { field: &'static str },

    #[error("field '{field}' is not a valid number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("field '{field}' is not a valid flag: {value:?}")]
    InvalidFlag { field: &'static str, value: String },

    #[error("field '{field}' out of range: {value}")]
    OutOfRange { field: &'static str, value: String },

    #[error("row is not valid UTF-8")]
    NotUtf8,
}

/// Splits one TSV line into fields.
///
/// Quotes are ordinary bytes; a trailing `\r` is dropped.
pub fn split_fields(line: &[u8]) -> RecordResult<Vec<&str>> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let text = std::str::from_utf8(line).map_err(|_| RecordError::NotUtf8)?;
    Ok(text.split('\t').collect())
}

fn check_columns(fields: &[&str], expected: usize) -> RecordResult<()> {
    if fields.len() < expected {
        return Err(RecordError::ColumnCount {
            expected,
            found: fields.len(),
        });
    }
    Ok(())
}

fn is_null(value: &str) -> bool {
    value.is_empty() || value == NULL_MARKER
}

fn required_text(fields: &[&str], idx: usize, field: &'static str) -> RecordResult<String> {
    match fields.get(idx) {
        Some(v) if !is_null(v) => Ok((*v).to_string()),
        _ => Err(RecordError::MissingField { field }),
    }
}

fn optional_text(fields: &[&str], idx: usize) -> Option<String> {
    fields
        .get(idx)
        .filter(|v| !is_null(v))
        .map(|v| (*v).to_string())
}

fn optional_number<T: std::str::FromStr>(
    fields: &[&str],
    idx: usize,
    field: &'static str,
) -> RecordResult<Option<T>> {
    match fields.get(idx) {
        Some(v) if !is_null(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| RecordError::InvalidNumber {
                field,
                value: (*v).to_string(),
            }),
        _ => Ok(None),
    }
}

fn required_number<T: std::str::FromStr>(
    fields: &[&str],
    idx: usize,
    field: &'static str,
) -> RecordResult<T> {
    optional_number(fields, idx, field)?.ok_or(RecordError::MissingField { field })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_fields_keeps_quotes() {
        let fields = split_fields(b"tt1\t\"Quoted\" Title\t\\N\r").unwrap();
        assert_eq!(fields, vec!["tt1", "\"Quoted\" Title", "\\N"]);
    }

    #[test]
    fn test_split_fields_rejects_invalid_utf8() {
        assert_eq!(split_fields(b"tt1\t\xff").unwrap_err(), RecordError::NotUtf8);
    }

    #[test]
    fn test_optional_number_null_and_invalid() {
        let fields = ["\\N", "12", "x"];
        assert_eq!(optional_number::<u32>(&fields, 0, "a").unwrap(), None);
        assert_eq!(optional_number::<u32>(&fields, 1, "b").unwrap(), Some(12));
        assert_eq!(optional_number::<u32>(&fields, 5, "c").unwrap(), None);
        assert!(matches!(
            optional_number::<u32>(&fields, 2, "d"),
            Err(RecordError::InvalidNumber { field: "d", .. })
        ));
    }
}
