//! Sorted build pipeline
//!
//! Turns a header-first TSV file into the strictly increasing entry stream
//! an index builder requires:
//!
//! 1. [`TsvSource`] maps the file and yields rows with their byte offsets
//! 2. [`collect_rows`] parses each row, counting rejects in a [`BuildReport`]
//! 3. [`SortedEntries`] buffers derived `(key, payload)` pairs, sorts them
//!    and feeds a builder
//!
//! Rows that fail to parse or encode are skipped and counted. I/O failures
//! and payload overflow abort the build.

mod report;
mod sorted;
mod source;

pub use report::BuildReport;
pub use sorted::SortedEntries;
pub use source::{TsvRow, TsvRows, TsvSource};

pub(crate) use source::split_line;

use crate::errors::IndexResult;

/// Parses every data row of `source` with `parse`. Items may borrow the
/// mapped source.
///
/// Per-record errors are absorbed by `report`; structural errors stop the
/// scan and are returned.
pub fn collect_rows<'s, T, F>(
    source: &'s TsvSource,
    domain: &str,
    report: &mut BuildReport,
    mut parse: F,
) -> IndexResult<Vec<T>>
where
    F: FnMut(TsvRow<'s>) -> IndexResult<T>,
{
    let mut out = Vec::new();
    for row in source.rows() {
        report.record_row();
        match parse(row) {
            Ok(item) => out.push(item),
            Err(e) => report.skip(domain, row.offset, e)?,
        }
    }
    Ok(out)
}
