//! Build summaries
//!
//! Per-record problems never abort a build. They are counted here, the
//! first few are kept as samples, and the whole report is logged once when
//! the build ends.

use serde::{Deserialize, Serialize};

use crate::errors::{IndexError, IndexErrorCode, IndexResult};
use crate::observability::{log_event_with_fields, Event};

/// Counts and samples for one domain build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    /// Data rows read from the source, header excluded
    pub rows_read: u64,
    /// Entries written to the index
    pub indexed: u64,
    /// Rows skipped because a required field failed to parse
    pub malformed: u64,
    /// Rows skipped because a value cannot be encoded into a key
    pub encoding_violations: u64,
    pub malformed_samples: Vec<String>,
    pub encoding_samples: Vec<String>,
    #[serde(skip)]
    max_samples: usize,
}

impl BuildReport {
    pub fn new(max_samples: usize) -> Self {
        Self {
            max_samples,
            ..Self::default()
        }
    }

    /// Rows skipped for any reason
    pub fn skipped(&self) -> u64 {
        self.malformed + self.encoding_violations
    }

    pub fn record_row(&mut self) {
        self.rows_read += 1;
    }

    pub fn record_indexed(&mut self, entries: u64) {
        self.indexed += entries;
    }

    /// Counts a rejected row at `offset`.
    ///
    /// Malformed rows and encoding violations are absorbed; any other error
    /// is structural and handed back to abort the build.
    pub fn skip(&mut self, domain: &str, offset: u64, err: IndexError) -> IndexResult<()> {
        let (count, samples) = match err.code() {
            IndexErrorCode::MalformedRecord => (&mut self.malformed, &mut self.malformed_samples),
            IndexErrorCode::EncodingViolation => {
                (&mut self.encoding_violations, &mut self.encoding_samples)
            }
            _ => return Err(err),
        };
        *count += 1;
        if samples.len() < self.max_samples {
            let sample = format!("offset {}: {}", offset, err.message());
            log_event_with_fields(
                Event::RecordSkipped,
                &[
                    ("code", err.code().code()),
                    ("domain", domain),
                    ("reason", sample.as_str()),
                ],
            );
            samples.push(sample);
        }
        Ok(())
    }

    /// Emits the report as one `BUILD_COMPLETE` line.
    pub fn log(&self, domain: &str) {
        let rows_read = self.rows_read.to_string();
        let indexed = self.indexed.to_string();
        let malformed = self.malformed.to_string();
        let encoding = self.encoding_violations.to_string();
        log_event_with_fields(
            Event::BuildComplete,
            &[
                ("domain", domain),
                ("encoding_violations", encoding.as_str()),
                ("indexed", indexed.as_str()),
                ("malformed", malformed.as_str()),
                ("rows_read", rows_read.as_str()),
            ],
        );
    }
}
