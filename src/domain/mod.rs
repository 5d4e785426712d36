//! Domain index facades
//!
//! Each facade composes the codec, the build pipeline, the ordered index
//! and the backing-store resolver into one dataset's queries:
//!
//! | facade         | files                                  | resolve      |
//! |----------------|----------------------------------------|--------------|
//! | [`AkaIndex`]     | `akas.idx`, `akas.tsv`                 | offset seek  |
//! | [`EpisodeIndex`] | `episode.shows.idx`, `episode.ids.idx` | key embedded |
//! | [`RatingIndex`]  | `ratings.idx`                          | key embedded |
//!
//! Every build also publishes `<domain>.manifest.json`. Facades are generic
//! over the [`OrderedIndex`] engine; `create` and `open` use the
//! memory-mapped [`SortedTable`].

mod aka;
mod episode;
mod manifest;
mod rating;

pub use aka::{AkaIndex, AKA_BACKING_FILE, AKA_DOMAIN, AKA_INDEX_FILE};
pub use episode::{EpisodeIndex, EPISODE_DOMAIN, EPISODE_IDS_FILE, EPISODE_SHOWS_FILE};
pub use manifest::{BuildManifest, ManifestFile, MANIFEST_VERSION};
pub use rating::{RatingIndex, RATING_DOMAIN, RATING_INDEX_FILE};

use std::fs;
use std::path::{Path, PathBuf};

use crate::codec::{prefix_upper_bound, CodecResult};
use crate::errors::{IndexError, IndexResult};
use crate::observability::{log_event_with_fields, Event, ObservationScope};
use crate::pipeline::{BuildReport, SortedEntries};
use crate::table::{OrderedIndex, SealedFile, SortedTable, SortedTableBuilder};

/// Default number of sample messages kept per reject class
pub const DEFAULT_MAX_REPORT_SAMPLES: usize = 16;

/// Knobs for a domain build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Sample messages kept for each class of skipped row
    pub max_report_samples: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_report_samples: DEFAULT_MAX_REPORT_SAMPLES,
        }
    }
}

/// Knobs for opening a built domain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenOptions {
    /// Run a full crc pass over every file at open
    pub verify_checksums: bool,
}

pub(crate) fn ensure_dir(dir: &Path) -> IndexResult<()> {
    fs::create_dir_all(dir)
        .map_err(|e| IndexError::build_io("failed to create index directory", dir, e))
}

/// Runs `build` inside a `<DOMAIN>_BUILD` observation scope.
pub(crate) fn observe_build<F>(domain: &str, source: &Path, build: F) -> IndexResult<BuildReport>
where
    F: FnOnce() -> IndexResult<BuildReport>,
{
    let source_display = source.display().to_string();
    log_event_with_fields(
        Event::BuildBegin,
        &[("domain", domain), ("source", source_display.as_str())],
    );
    let scope = ObservationScope::with_fields(
        format!("{}_BUILD", domain.to_ascii_uppercase()),
        &[("source", source_display.as_str())],
    );
    match build() {
        Ok(report) => {
            let indexed = report.indexed.to_string();
            let skipped = report.skipped().to_string();
            scope.complete_with_fields(&[
                ("indexed", indexed.as_str()),
                ("skipped", skipped.as_str()),
            ]);
            Ok(report)
        }
        Err(e) => {
            let reason = e.to_string();
            if e.is_fatal() {
                scope.fail_fatal(&reason);
            } else {
                scope.fail(&reason);
            }
            Err(e)
        }
    }
}

/// The files of one domain build.
///
/// Every file is written and synced under a temp name first; nothing is
/// renamed until all of them are complete, so a failed build leaves the
/// previously published set untouched. The manifest is renamed last.
pub(crate) struct StagedBuild {
    dir: PathBuf,
    files: Vec<StagedFile>,
}

struct StagedFile {
    name: &'static str,
    file: SealedFile,
    entries: Option<u64>,
}

impl StagedBuild {
    pub(crate) fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            files: Vec::new(),
        }
    }

    /// Sorts `entries` into a sealed table that will be published as `name`.
    pub(crate) fn add_table(
        &mut self,
        entries: SortedEntries,
        name: &'static str,
    ) -> IndexResult<()> {
        let mut builder = SortedTableBuilder::create(&self.dir.join(name))?;
        entries.insert_into(&mut builder)?;
        let (summary, file) = builder.seal()?.into_parts();
        self.files.push(StagedFile {
            name,
            file,
            entries: Some(summary.entry_count),
        });
        Ok(())
    }

    /// Adds an already sealed companion file.
    pub(crate) fn add_file(&mut self, name: &'static str, file: SealedFile) {
        self.files.push(StagedFile {
            name,
            file,
            entries: None,
        });
    }

    /// Records every staged file in `manifest`, then publishes the files
    /// in staging order and the manifest after them.
    pub(crate) fn publish(self, mut manifest: BuildManifest) -> IndexResult<BuildManifest> {
        let StagedBuild { dir, files } = self;
        for staged in &files {
            manifest.add_staged(staged.name, staged.file.temp_path())?;
        }
        let manifest_file = manifest.stage(&dir)?;

        for staged in files {
            let final_path = dir.join(staged.name);
            let path = staged
                .file
                .publish()
                .map_err(|e| IndexError::build_io("failed to publish file", &final_path, e))?;
            let path_display = path.display().to_string();
            let entries = staged.entries.map(|n| n.to_string());
            let mut fields = vec![("file", path_display.as_str())];
            if let Some(entries) = &entries {
                fields.push(("entries", entries.as_str()));
            }
            log_event_with_fields(Event::IndexPublished, &fields);
        }

        let manifest_path = BuildManifest::path(&dir, &manifest.domain);
        manifest_file
            .publish()
            .map_err(|e| IndexError::build_io("failed to publish manifest", &manifest_path, e))?;
        Ok(manifest)
    }
}

/// Maps a sealed table, optionally running the full checksum pass.
pub(crate) fn open_table(path: &Path, options: &OpenOptions) -> IndexResult<SortedTable> {
    let table = SortedTable::open(path)?;
    if options.verify_checksums {
        if let Err(e) = table.verify_checksum() {
            let reason = e.to_string();
            log_event_with_fields(Event::IndexCorruption, &[("reason", reason.as_str())]);
            return Err(e.into());
        }
    }
    let path_display = path.display().to_string();
    let entries = table.len().to_string();
    log_event_with_fields(
        Event::IndexOpened,
        &[("entries", entries.as_str()), ("file", path_display.as_str())],
    );
    Ok(table)
}

/// Decodes the keys of every entry starting with `prefix`, up to `limit`.
pub(crate) fn scan_prefix<I, T, D>(
    index: &I,
    prefix: &[u8],
    limit: Option<usize>,
    decode: D,
) -> IndexResult<Vec<T>>
where
    I: OrderedIndex,
    D: Fn(&[u8]) -> CodecResult<T>,
{
    let upper = prefix_upper_bound(prefix);
    let mut out = Vec::new();
    for entry in index.range(prefix, upper.as_deref()) {
        if limit.map_or(false, |limit| out.len() >= limit) {
            break;
        }
        let (key, _) = entry?;
        out.push(decode(key)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backing::ResolvePolicy;
    use crate::codec::{decode_rating, id_prefix, rating_key};
    use crate::observability::capture_lines;
    use crate::records::Rating;
    use crate::table::{IndexBuilder, MemoryIndex};
    use tempfile::TempDir;

    fn dir_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn entries_of(keys: &[&[u8]]) -> SortedEntries {
        let mut entries = SortedEntries::new();
        for (i, key) in keys.iter().enumerate() {
            entries.push(key.to_vec(), i as u64);
        }
        entries
    }

    fn rating(id: &str, value: f32, votes: u32) -> Rating {
        Rating {
            id: id.to_string(),
            rating: value,
            votes,
        }
    }

    #[test]
    fn test_scan_prefix_respects_identifier_boundary() {
        let mut entries = SortedEntries::new();
        for r in [rating("tt1", 5.0, 1), rating("tt10", 6.0, 2), rating("tt2", 7.0, 3)] {
            entries.push(rating_key(&r).unwrap(), 0);
        }
        let index = entries.write_to(MemoryIndex::builder()).unwrap();

        let prefix = id_prefix("tt1").unwrap();
        let found = scan_prefix(&index, &prefix, None, decode_rating).unwrap();
        assert_eq!(found, vec![rating("tt1", 5.0, 1)]);
    }

    #[test]
    fn test_scan_prefix_limit() {
        let mut builder = MemoryIndex::builder();
        for key in ["a\x00x", "a\x00y", "a\x00z"] {
            builder.insert(key.as_bytes(), 0).unwrap();
        }
        let index = builder.finish().unwrap();
        let keys = scan_prefix(&index, b"a\x00", Some(2), |k| Ok(k.to_vec())).unwrap();
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_undecodable_key_is_corruption() {
        let mut builder = MemoryIndex::builder();
        builder.insert(b"tt1\x00\x01", 0).unwrap();
        let index = builder.finish().unwrap();
        let err = scan_prefix(&index, b"tt1\x00", None, decode_rating).unwrap_err();
        assert_eq!(err.code(), crate::errors::IndexErrorCode::IndexCorruption);
    }

    #[test]
    fn test_staged_build_publishes_nothing_until_all_sealed() {
        let tmp = TempDir::new().unwrap();
        let mut first = StagedBuild::new(tmp.path());
        first.add_table(entries_of(&[b"a", b"b"]), "first.idx").unwrap();
        first.add_table(entries_of(&[b"c"]), "second.idx").unwrap();
        first
            .publish(BuildManifest::new(
                "pair",
                Path::new("pair.tsv"),
                ResolvePolicy::KeyEmbedded,
                &BuildReport::new(1),
            ))
            .unwrap();
        let first_bytes = fs::read(tmp.path().join("first.idx")).unwrap();
        let second_bytes = fs::read(tmp.path().join("second.idx")).unwrap();

        // The second table fails after the first is already sealed
        let mut rebuild = StagedBuild::new(tmp.path());
        rebuild.add_table(entries_of(&[b"x", b"y", b"z"]), "first.idx").unwrap();
        let too_long = vec![b'k'; u16::MAX as usize + 1];
        let err = rebuild
            .add_table(entries_of(&[too_long.as_slice()]), "second.idx")
            .unwrap_err();
        assert_eq!(err.code(), crate::errors::IndexErrorCode::BuildIoFailed);
        drop(rebuild);

        assert_eq!(fs::read(tmp.path().join("first.idx")).unwrap(), first_bytes);
        assert_eq!(fs::read(tmp.path().join("second.idx")).unwrap(), second_bytes);
        assert_eq!(
            dir_names(tmp.path()),
            vec!["first.idx", "pair.manifest.json", "second.idx"]
        );

        let manifest = BuildManifest::load(tmp.path(), "pair").unwrap().unwrap();
        manifest.verify(tmp.path(), true).unwrap();
        let names: Vec<&str> = manifest.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["first.idx", "second.idx"]);
    }

    #[test]
    fn test_out_of_order_staging_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut staged = StagedBuild::new(tmp.path());
        let mut entries = SortedEntries::new();
        entries.push(b"dup".to_vec(), 1);
        entries.push(b"dup".to_vec(), 2);
        let err = staged.add_table(entries, "dup.idx").unwrap_err();
        assert_eq!(err.code(), crate::errors::IndexErrorCode::BuildIoFailed);
        drop(staged);
        assert!(dir_names(tmp.path()).is_empty());
    }

    #[test]
    fn test_build_logs_begin_publish_complete() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("title.ratings.tsv");
        fs::write(&data, "tconst\taverageRating\tnumVotes\ntt0000001\t5.8\t1356\n").unwrap();

        let (index, lines) = capture_lines(|| {
            RatingIndex::create(&data, &tmp.path().join("idx"), &BuildOptions::default())
        });
        assert_eq!(index.unwrap().len(), 1);

        let parsed: Vec<serde_json::Value> = lines
            .iter()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        let events: Vec<&str> = parsed.iter().map(|v| v["event"].as_str().unwrap()).collect();
        assert_eq!(events[0], "BUILD_BEGIN");
        assert_eq!(parsed[0]["domain"], "ratings");
        assert_eq!(events[1], "RATINGS_BUILD_BEGIN");

        let published = events.iter().position(|e| *e == "INDEX_PUBLISHED").unwrap();
        let complete = events.iter().position(|e| *e == "BUILD_COMPLETE").unwrap();
        let scope_done = events.iter().position(|e| *e == "RATINGS_BUILD_COMPLETE").unwrap();
        assert!(published < complete && complete < scope_done);
    }
}
