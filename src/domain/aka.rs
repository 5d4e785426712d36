//! Alternate-title (aka) index
//!
//! Aka rows carry free text that does not belong in a key, so the table
//! maps each identifier to a packed `(count, offset)` locating its rows in
//! the companion file `akas.tsv`.
//!
//! The count is only meaningful if an identifier's rows are contiguous.
//! The build therefore writes `akas.tsv` itself: the source header, then
//! every valid source row stable-sorted by identifier. Offsets always point
//! into that file, never into the source.

use std::io::Write;
use std::path::Path;

use crate::backing::{BackingStore, ResolvePolicy};
use crate::codec::{aka_key, pack_aka_payload, unpack_aka_payload};
use crate::errors::{IndexError, IndexErrorCode, IndexResult};
use crate::pipeline::{collect_rows, BuildReport, SortedEntries, TsvSource};
use crate::records::{split_fields, Aka};
use crate::table::{AtomicFile, OrderedIndex, SealedFile, SortedTable};

use super::manifest::{check_manifest, BuildManifest};
use super::{ensure_dir, observe_build, open_table, StagedBuild};
use super::{BuildOptions, OpenOptions};

pub const AKA_DOMAIN: &str = "akas";
pub const AKA_INDEX_FILE: &str = "akas.idx";
pub const AKA_BACKING_FILE: &str = "akas.tsv";

/// A valid source row and its key
struct KeyedRow<'s> {
    key: Vec<u8>,
    line: &'s [u8],
}

/// Alternate titles by title identifier
pub struct AkaIndex<I = SortedTable> {
    table: I,
    backing: BackingStore,
    report: Option<BuildReport>,
}

impl AkaIndex<SortedTable> {
    /// Builds `akas.tsv` and `akas.idx` in `index_dir` from the aka dataset
    /// at `data_path`, then opens them.
    pub fn create(data_path: &Path, index_dir: &Path, options: &BuildOptions) -> IndexResult<Self> {
        let report = observe_build(AKA_DOMAIN, data_path, || {
            ensure_dir(index_dir)?;
            Self::build(data_path, index_dir, options)
        })?;

        let mut index = Self::open(index_dir, &OpenOptions::default())?;
        index.report = Some(report);
        Ok(index)
    }

    fn build(
        data_path: &Path,
        index_dir: &Path,
        options: &BuildOptions,
    ) -> IndexResult<BuildReport> {
        let source = TsvSource::open(data_path)?;
        let mut report = BuildReport::new(options.max_report_samples);
        let mut rows = collect_rows(&source, AKA_DOMAIN, &mut report, |row| {
            let fields = split_fields(row.line)?;
            let aka = Aka::from_fields(&fields)?;
            Ok(KeyedRow {
                key: aka_key(&aka.id)?,
                line: row.line,
            })
        })?;
        rows.sort_by(|a, b| a.key.cmp(&b.key));

        report.record_indexed(rows.len() as u64);

        // The pair is renamed only after both files are sealed
        let mut staged = StagedBuild::new(index_dir);
        let (entries, backing) =
            write_grouped(source.header(), &mut rows, &index_dir.join(AKA_BACKING_FILE))?;
        staged.add_file(AKA_BACKING_FILE, backing);
        staged.add_table(entries, AKA_INDEX_FILE)?;
        staged.publish(BuildManifest::new(
            AKA_DOMAIN,
            data_path,
            ResolvePolicy::OffsetSeek,
            &report,
        ))?;
        report.log(AKA_DOMAIN);
        Ok(report)
    }

    /// Opens a previously built aka index and its backing file.
    pub fn open(index_dir: &Path, options: &OpenOptions) -> IndexResult<Self> {
        let table = open_table(&index_dir.join(AKA_INDEX_FILE), options)?;
        let backing = BackingStore::open(&index_dir.join(AKA_BACKING_FILE))?;
        check_manifest(index_dir, AKA_DOMAIN, options.verify_checksums)?;
        Ok(Self::from_parts(table, backing))
    }
}

/// Writes the header and the id-sorted rows to a sealed temp file for
/// `path`, returning one `(id, packed count and offset)` entry per
/// identifier along with the unpublished file.
fn write_grouped(
    header: &[u8],
    rows: &mut [KeyedRow<'_>],
    path: &Path,
) -> IndexResult<(SortedEntries, SealedFile)> {
    let io_err = |e| IndexError::build_io("failed to write backing file", path, e);
    let mut out = AtomicFile::create(path).map_err(io_err)?;

    let mut position = 0u64;
    let mut write_line = |out: &mut AtomicFile, line: &[u8]| -> IndexResult<u64> {
        let at = position;
        out.write_all(line).map_err(io_err)?;
        out.write_all(b"\n").map_err(io_err)?;
        position += line.len() as u64 + 1;
        Ok(at)
    };

    write_line(&mut out, header)?;
    let mut entries = SortedEntries::new();
    let mut start = 0;
    while start < rows.len() {
        let mut end = start;
        let mut first = None;
        while end < rows.len() && rows[end].key == rows[start].key {
            let at = write_line(&mut out, rows[end].line)?;
            first.get_or_insert(at);
            end += 1;
        }
        let payload = pack_aka_payload((end - start) as u64, first.unwrap_or_default())?;
        entries.push(std::mem::take(&mut rows[start].key), payload);
        start = end;
    }

    let sealed = out
        .seal()
        .map_err(|e| IndexError::build_io("failed to sync backing file", path, e))?;
    Ok((entries, sealed))
}

impl<I: OrderedIndex> AkaIndex<I> {
    /// Wraps an already built index and its backing file.
    pub fn from_parts(table: I, backing: BackingStore) -> Self {
        Self {
            table,
            backing,
            report: None,
        }
    }

    /// Every alternate title of `id`, in backing-file order. Empty when the
    /// identifier is not indexed.
    pub fn find(&self, id: &str) -> IndexResult<Vec<Aka>> {
        let key = match aka_key(id) {
            Ok(key) => key,
            Err(_) => return Ok(Vec::new()),
        };
        let packed = match self.table.get(&key)? {
            Some(packed) => packed,
            None => return Ok(Vec::new()),
        };
        let payload = unpack_aka_payload(packed);
        if payload.count == 0 {
            return Err(IndexError::new(
                IndexErrorCode::IndexCorruption,
                format!("aka entry for {} has a zero row count", id),
            ));
        }

        let rows = self.backing.rows_at(payload.offset, payload.count as usize)?;
        rows.into_iter()
            .map(|line| {
                let aka = split_fields(line)
                    .and_then(|fields| Aka::from_fields(&fields))
                    .map_err(|e| {
                        self.backing.desync(format!(
                            "row for {} near offset {} does not parse: {}",
                            id, payload.offset, e
                        ))
                    })?;
                if aka.id != id {
                    return Err(self.backing.desync(format!(
                        "row for {} at offset {} belongs to {}",
                        id, payload.offset, aka.id
                    )));
                }
                Ok(aka)
            })
            .collect()
    }

    /// Number of distinct identifiers
    pub fn len(&self) -> u64 {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn resolve_policy(&self) -> ResolvePolicy {
        ResolvePolicy::OffsetSeek
    }

    pub fn backing(&self) -> &BackingStore {
        &self.backing
    }

    /// Report of the build that produced this handle, if it did
    pub fn report(&self) -> Option<&BuildReport> {
        self.report.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{IndexBuilder, MemoryIndex};
    use std::fs;
    use tempfile::TempDir;

    const HEADER: &str =
        "titleId\tordering\ttitle\tregion\tlanguage\ttypes\tattributes\tisOriginalTitle";

    fn write_source(tmp: &TempDir, rows: &[&str]) -> std::path::PathBuf {
        let path = tmp.path().join("title.akas.tsv");
        let mut contents = format!("{}\n", HEADER);
        for row in rows {
            contents.push_str(row);
            contents.push('\n');
        }
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_find_regroups_scattered_rows() {
        let tmp = TempDir::new().unwrap();
        let data = write_source(
            &tmp,
            &[
                "tt0000002\t1\tLe clown et ses chiens\t\\N\t\\N\toriginal\t\\N\t1",
                "tt0000001\t1\tCarmencita\t\\N\t\\N\toriginal\t\\N\t1",
                "tt0000002\t2\tThe Clown and His Dogs\tUS\t\\N\t\\N\tliteral English title\t0",
                "tt0000001\t2\tCarmencita\tDE\t\\N\t\\N\tliteral title\t0",
            ],
        );
        let index =
            AkaIndex::create(&data, &tmp.path().join("idx"), &BuildOptions::default()).unwrap();

        let akas = index.find("tt0000002").unwrap();
        assert_eq!(akas.len(), 2);
        assert_eq!(akas[0].order, Some(1));
        assert_eq!(akas[1].title, "The Clown and His Dogs");
        assert_eq!(akas[1].region.as_deref(), Some("US"));
        assert_eq!(index.find("tt0000001").unwrap().len(), 2);
        assert!(index.find("tt0000003").unwrap().is_empty());
        assert_eq!(index.len(), 2);

        let backing = fs::read_to_string(tmp.path().join("idx").join(AKA_BACKING_FILE)).unwrap();
        let ids: Vec<&str> = backing
            .lines()
            .skip(1)
            .map(|l| l.split('\t').next().unwrap())
            .collect();
        assert_eq!(ids, vec!["tt0000001", "tt0000001", "tt0000002", "tt0000002"]);
        assert!(backing.starts_with(HEADER));
    }

    #[test]
    fn test_grouped_source_copied_verbatim() {
        let tmp = TempDir::new().unwrap();
        let data = write_source(
            &tmp,
            &[
                "tt0000001\t1\tCarmencita\t\\N\t\\N\toriginal\t\\N\t1",
                "tt0000001\t2\tCarmencita\tDE\t\\N\t\\N\tliteral title\t0",
                "tt0000005\t1\tBlacksmith Scene\t\\N\t\\N\toriginal\t\\N\t1",
            ],
        );
        AkaIndex::create(&data, &tmp.path().join("idx"), &BuildOptions::default()).unwrap();
        assert_eq!(
            fs::read(tmp.path().join("idx").join(AKA_BACKING_FILE)).unwrap(),
            fs::read(&data).unwrap()
        );
    }

    #[test]
    fn test_malformed_rows_are_dropped_from_backing() {
        let tmp = TempDir::new().unwrap();
        let data = write_source(
            &tmp,
            &[
                "tt0000001\t1\tCarmencita\t\\N\t\\N\toriginal\t\\N\t1",
                "tt0000001\tfirst\tBroken ordering\t\\N\t\\N\t\\N\t\\N\t0",
                "tt0000009",
            ],
        );
        let index =
            AkaIndex::create(&data, &tmp.path().join("idx"), &BuildOptions::default()).unwrap();
        let report = index.report().unwrap();
        assert_eq!(report.rows_read, 3);
        assert_eq!(report.malformed, 2);
        assert_eq!(index.find("tt0000001").unwrap().len(), 1);
        assert!(index.find("tt0000009").unwrap().is_empty());
    }

    #[test]
    fn test_foreign_backing_file_is_desync() {
        let tmp = TempDir::new().unwrap();
        let idx = tmp.path().join("idx");
        let data = write_source(
            &tmp,
            &[
                "tt0000001\t1\tCarmencita\t\\N\t\\N\toriginal\t\\N\t1",
                "tt0000002\t1\tLe clown et ses chiens\t\\N\t\\N\toriginal\t\\N\t1",
            ],
        );
        AkaIndex::create(&data, &idx, &BuildOptions::default()).unwrap();

        // Same length, rows swapped: the manifest length check passes
        let backing_path = idx.join(AKA_BACKING_FILE);
        let original = fs::read_to_string(&backing_path).unwrap();
        let mut lines: Vec<&str> = original.lines().collect();
        lines.swap(1, 2);
        fs::write(&backing_path, format!("{}\n", lines.join("\n"))).unwrap();

        let index = AkaIndex::open(&idx, &OpenOptions::default()).unwrap();
        let err = index.find("tt0000001").unwrap_err();
        assert_eq!(err.code(), IndexErrorCode::BackingStoreDesync);
    }

    #[test]
    fn test_memory_engine_with_same_backing() {
        let tmp = TempDir::new().unwrap();
        let idx = tmp.path().join("idx");
        let data = write_source(
            &tmp,
            &[
                "tt0000003\t1\tPauvre Pierrot\t\\N\t\\N\toriginal\t\\N\t1",
                "tt0000001\t1\tCarmencita\t\\N\t\\N\toriginal\t\\N\t1",
            ],
        );
        let on_disk = AkaIndex::create(&data, &idx, &BuildOptions::default()).unwrap();

        let table = SortedTable::open(&idx.join(AKA_INDEX_FILE)).unwrap();
        let mut builder = MemoryIndex::builder();
        for entry in table.iter() {
            let (key, value) = entry.unwrap();
            builder.insert(key, value).unwrap();
        }
        let memory = AkaIndex::from_parts(
            builder.finish().unwrap(),
            BackingStore::open(&idx.join(AKA_BACKING_FILE)).unwrap(),
        );

        for id in ["tt0000001", "tt0000003", "tt0000002"] {
            assert_eq!(on_disk.find(id).unwrap(), memory.find(id).unwrap());
        }
    }

    #[test]
    fn test_embedded_nul_id_is_encoding_violation() {
        let tmp = TempDir::new().unwrap();
        let data = write_source(
            &tmp,
            &[
                "tt0000001\t1\tCarmencita\t\\N\t\\N\toriginal\t\\N\t1",
                "tt00\u{0}0002\t1\tLe clown et ses chiens\t\\N\t\\N\toriginal\t\\N\t1",
                "tt0000003\t1\tPauvre Pierrot\t\\N\t\\N\toriginal\t\\N\t1",
            ],
        );
        let index =
            AkaIndex::create(&data, &tmp.path().join("idx"), &BuildOptions::default()).unwrap();

        let report = index.report().unwrap();
        assert_eq!(report.encoding_violations, 1);
        assert_eq!(report.malformed, 0);
        assert_eq!(report.indexed, 2);
        assert_eq!(index.len(), 2);
        assert_eq!(index.find("tt0000003").unwrap()[0].title, "Pauvre Pierrot");

        let backing = fs::read(tmp.path().join("idx").join(AKA_BACKING_FILE)).unwrap();
        assert!(!backing.contains(&0u8));
    }

    #[test]
    fn test_failed_rebuild_keeps_published_pair() {
        let tmp = TempDir::new().unwrap();
        let idx = tmp.path().join("idx");
        let data = write_source(
            &tmp,
            &[
                "tt0000001\t1\tCarmencita\t\\N\t\\N\toriginal\t\\N\t1",
                "tt0000001\t2\tCarmencita\tDE\t\\N\t\\N\tliteral title\t0",
            ],
        );
        AkaIndex::create(&data, &idx, &BuildOptions::default()).unwrap();
        let index_before = fs::read(idx.join(AKA_INDEX_FILE)).unwrap();
        let backing_before = fs::read(idx.join(AKA_BACKING_FILE)).unwrap();

        // Valid row, but its key cannot be stored in the table
        let long_row = format!("tt{}\t1\tLong\t\\N\t\\N\t\\N\t\\N\t0", "9".repeat(70_000));
        let data = write_source(
            &tmp,
            &["tt0000002\t1\tLe clown et ses chiens\t\\N\t\\N\toriginal\t\\N\t1", &long_row],
        );
        let err = AkaIndex::create(&data, &idx, &BuildOptions::default()).err().unwrap();
        assert_eq!(err.code(), IndexErrorCode::BuildIoFailed);

        assert_eq!(fs::read(idx.join(AKA_INDEX_FILE)).unwrap(), index_before);
        assert_eq!(fs::read(idx.join(AKA_BACKING_FILE)).unwrap(), backing_before);
        let leftovers: Vec<_> = fs::read_dir(&idx)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        let reopened = AkaIndex::open(&idx, &OpenOptions { verify_checksums: true }).unwrap();
        assert_eq!(reopened.find("tt0000001").unwrap().len(), 2);
        assert!(reopened.find("tt0000002").unwrap().is_empty());
    }
}
