//! Rating index
//!
//! One table keyed `id 0x00 rating votes`. The whole record lives in the
//! key, so a lookup is a prefix scan on `id 0x00` decoded straight from the
//! first hit. The payload is the source row offset, kept for diagnostics.

use std::path::Path;

use crate::backing::ResolvePolicy;
use crate::codec::{decode_rating, id_prefix, rating_key};
use crate::errors::IndexResult;
use crate::pipeline::{collect_rows, BuildReport, SortedEntries, TsvSource};
use crate::records::{split_fields, Rating};
use crate::table::{OrderedIndex, SortedTable};

use super::manifest::{check_manifest, BuildManifest};
use super::{ensure_dir, observe_build, open_table, scan_prefix, StagedBuild};
use super::{BuildOptions, OpenOptions};

pub const RATING_DOMAIN: &str = "ratings";
pub const RATING_INDEX_FILE: &str = "ratings.idx";

/// Ratings by title identifier
pub struct RatingIndex<I = SortedTable> {
    table: I,
    report: Option<BuildReport>,
}

impl RatingIndex<SortedTable> {
    /// Builds `ratings.idx` in `index_dir` from the ratings dataset at
    /// `data_path`, then opens it.
    pub fn create(data_path: &Path, index_dir: &Path, options: &BuildOptions) -> IndexResult<Self> {
        let report = observe_build(RATING_DOMAIN, data_path, || {
            ensure_dir(index_dir)?;
            let (entries, mut report) = Self::collect_entries(data_path, options)?;
            report.record_indexed(entries.len() as u64);

            let mut staged = StagedBuild::new(index_dir);
            staged.add_table(entries, RATING_INDEX_FILE)?;
            staged.publish(BuildManifest::new(
                RATING_DOMAIN,
                data_path,
                ResolvePolicy::KeyEmbedded,
                &report,
            ))?;
            report.log(RATING_DOMAIN);
            Ok(report)
        })?;

        let mut index = Self::open(index_dir, &OpenOptions::default())?;
        index.report = Some(report);
        Ok(index)
    }

    /// Opens a previously built rating index.
    pub fn open(index_dir: &Path, options: &OpenOptions) -> IndexResult<Self> {
        let table = open_table(&index_dir.join(RATING_INDEX_FILE), options)?;
        check_manifest(index_dir, RATING_DOMAIN, options.verify_checksums)?;
        Ok(Self::from_index(table))
    }

    /// Parses the dataset into unsorted `(key, offset)` entries.
    pub fn collect_entries(
        data_path: &Path,
        options: &BuildOptions,
    ) -> IndexResult<(SortedEntries, BuildReport)> {
        let source = TsvSource::open(data_path)?;
        let mut report = BuildReport::new(options.max_report_samples);
        let keyed = collect_rows(&source, RATING_DOMAIN, &mut report, |row| {
            let fields = split_fields(row.line)?;
            let rating = Rating::from_fields(&fields)?;
            Ok((rating_key(&rating)?, row.offset))
        })?;

        let mut entries = SortedEntries::with_capacity(keyed.len());
        for (key, offset) in keyed {
            entries.push(key, offset);
        }
        Ok((entries, report))
    }
}

impl<I: OrderedIndex> RatingIndex<I> {
    /// Wraps an already built index.
    pub fn from_index(table: I) -> Self {
        Self {
            table,
            report: None,
        }
    }

    /// The rating of title `id`, if it has one.
    pub fn rating_by_id(&self, id: &str) -> IndexResult<Option<Rating>> {
        // An identifier that cannot be encoded was never indexed.
        let prefix = match id_prefix(id) {
            Ok(prefix) => prefix,
            Err(_) => return Ok(None),
        };
        let mut found = scan_prefix(&self.table, &prefix, Some(1), decode_rating)?;
        Ok(found.pop())
    }

    /// Number of indexed ratings
    pub fn len(&self) -> u64 {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn resolve_policy(&self) -> ResolvePolicy {
        ResolvePolicy::KeyEmbedded
    }

    /// Report of the build that produced this handle, if it did
    pub fn report(&self) -> Option<&BuildReport> {
        self.report.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::IndexErrorCode;
    use crate::table::MemoryIndex;
    use std::fs;
    use tempfile::TempDir;

    const DATA: &str = "tconst\taverageRating\tnumVotes\n\
                        tt0000002\t6.0\t236\n\
                        tt0000001\t5.8\t1356\n\
                        tt0000003\tnine\t1\n\
                        tt00000010\t6.9\t7\n";

    fn build(tmp: &TempDir) -> RatingIndex {
        let data = tmp.path().join("title.ratings.tsv");
        fs::write(&data, DATA).unwrap();
        RatingIndex::create(&data, &tmp.path().join("idx"), &BuildOptions::default()).unwrap()
    }

    #[test]
    fn test_rating_by_id() {
        let tmp = TempDir::new().unwrap();
        let index = build(&tmp);

        let r = index.rating_by_id("tt0000001").unwrap().unwrap();
        assert_eq!(r.rating, 5.8);
        assert_eq!(r.votes, 1356);
        assert_eq!(index.rating_by_id("tt00000010").unwrap().unwrap().votes, 7);
        assert!(index.rating_by_id("tt9999999").unwrap().is_none());
        assert!(index.rating_by_id("tt000000").unwrap().is_none());
        assert!(index.rating_by_id("tt\u{0}1").unwrap().is_none());
    }

    #[test]
    fn test_build_report_counts_malformed() {
        let tmp = TempDir::new().unwrap();
        let index = build(&tmp);
        let report = index.report().unwrap();
        assert_eq!(report.rows_read, 4);
        assert_eq!(report.indexed, 3);
        assert_eq!(report.malformed, 1);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_reopen_and_memory_engine_agree() {
        let tmp = TempDir::new().unwrap();
        build(&tmp);
        let reopened = RatingIndex::open(
            &tmp.path().join("idx"),
            &OpenOptions {
                verify_checksums: true,
            },
        )
        .unwrap();
        assert!(reopened.report().is_none());

        let (entries, _) = RatingIndex::collect_entries(
            &tmp.path().join("title.ratings.tsv"),
            &BuildOptions::default(),
        )
        .unwrap();
        let memory = RatingIndex::from_index(entries.write_to(MemoryIndex::builder()).unwrap());

        for id in ["tt0000001", "tt0000002", "tt00000010", "tt0000003", "tt1"] {
            assert_eq!(
                reopened.rating_by_id(id).unwrap(),
                memory.rating_by_id(id).unwrap()
            );
        }
    }

    #[test]
    fn test_open_missing_is_open_failed() {
        let tmp = TempDir::new().unwrap();
        let err = RatingIndex::open(tmp.path(), &OpenOptions::default()).err().unwrap();
        assert_eq!(err.code(), IndexErrorCode::OpenFailed);
    }

    #[test]
    fn test_embedded_nul_id_is_encoding_violation() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("title.ratings.tsv");
        fs::write(
            &data,
            "tconst\taverageRating\tnumVotes\n\
             tt0000001\t5.8\t1356\n\
             tt00\u{0}0002\t6.0\t236\n\
             tt0000003\t6.5\t1\n",
        )
        .unwrap();
        let index =
            RatingIndex::create(&data, &tmp.path().join("idx"), &BuildOptions::default()).unwrap();

        let report = index.report().unwrap();
        assert_eq!(report.rows_read, 3);
        assert_eq!(report.encoding_violations, 1);
        assert_eq!(report.malformed, 0);
        assert_eq!(report.indexed, 2);
        assert!(report.encoding_samples[0].starts_with("offset 49:"));

        assert_eq!(index.len(), 2);
        assert!(index.rating_by_id("tt0000001").unwrap().is_some());
        assert!(index.rating_by_id("tt0000003").unwrap().is_some());
        assert!(index.rating_by_id("tt00\u{0}0002").unwrap().is_none());
    }
}
