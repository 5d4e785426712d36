//! Episode index
//!
//! Two tables over the same episode rows:
//!
//! - show-major `show 0x00 season episode id` answers per-show and
//!   per-season listings in season, episode order
//! - episode-major `id 0x00 season episode show` answers lookups by
//!   episode identifier
//!
//! Both carry every field of an [`Episode`] in the key. Payloads are source
//! row offsets, kept for diagnostics.

use std::path::Path;

use crate::backing::ResolvePolicy;
use crate::codec::{
    decode_episode_major, decode_show_major, episode_major_key, id_prefix, season_prefix,
    show_major_key, ABSENT_U32,
};
use crate::errors::IndexResult;
use crate::pipeline::{collect_rows, BuildReport, SortedEntries, TsvSource};
use crate::records::{split_fields, Episode};
use crate::table::{OrderedIndex, SortedTable};

use super::manifest::{check_manifest, BuildManifest};
use super::{ensure_dir, observe_build, open_table, scan_prefix, StagedBuild};
use super::{BuildOptions, OpenOptions};

pub const EPISODE_DOMAIN: &str = "episode";
pub const EPISODE_SHOWS_FILE: &str = "episode.shows.idx";
pub const EPISODE_IDS_FILE: &str = "episode.ids.idx";

/// Both orderings of one parsed row
struct KeyedEpisode {
    show_major: Vec<u8>,
    episode_major: Vec<u8>,
    offset: u64,
}

/// Episodes by show, by season and by identifier
pub struct EpisodeIndex<I = SortedTable> {
    shows: I,
    ids: I,
    report: Option<BuildReport>,
}

impl EpisodeIndex<SortedTable> {
    /// Builds both episode tables in `index_dir` from the episode dataset
    /// at `data_path`, then opens them.
    pub fn create(data_path: &Path, index_dir: &Path, options: &BuildOptions) -> IndexResult<Self> {
        let report = observe_build(EPISODE_DOMAIN, data_path, || {
            ensure_dir(index_dir)?;
            let (shows, ids, mut report) = Self::collect_entries(data_path, options)?;
            report.record_indexed(shows.len() as u64);

            // Two independent passes, one per ordering, published together
            let mut staged = StagedBuild::new(index_dir);
            staged.add_table(shows, EPISODE_SHOWS_FILE)?;
            staged.add_table(ids, EPISODE_IDS_FILE)?;
            staged.publish(BuildManifest::new(
                EPISODE_DOMAIN,
                data_path,
                ResolvePolicy::KeyEmbedded,
                &report,
            ))?;
            report.log(EPISODE_DOMAIN);
            Ok(report)
        })?;

        let mut index = Self::open(index_dir, &OpenOptions::default())?;
        index.report = Some(report);
        Ok(index)
    }

    /// Opens a previously built episode index.
    pub fn open(index_dir: &Path, options: &OpenOptions) -> IndexResult<Self> {
        let shows = open_table(&index_dir.join(EPISODE_SHOWS_FILE), options)?;
        let ids = open_table(&index_dir.join(EPISODE_IDS_FILE), options)?;
        check_manifest(index_dir, EPISODE_DOMAIN, options.verify_checksums)?;
        Ok(Self::from_indexes(shows, ids))
    }

    /// Parses the dataset into unsorted show-major and episode-major
    /// entries.
    ///
    /// A row is kept only if both of its keys encode, so the two orderings
    /// always hold the same episodes.
    pub fn collect_entries(
        data_path: &Path,
        options: &BuildOptions,
    ) -> IndexResult<(SortedEntries, SortedEntries, BuildReport)> {
        let source = TsvSource::open(data_path)?;
        let mut report = BuildReport::new(options.max_report_samples);
        let keyed = collect_rows(&source, EPISODE_DOMAIN, &mut report, |row| {
            let fields = split_fields(row.line)?;
            let episode = Episode::from_fields(&fields)?;
            Ok(KeyedEpisode {
                show_major: show_major_key(&episode)?,
                episode_major: episode_major_key(&episode)?,
                offset: row.offset,
            })
        })?;

        let mut shows = SortedEntries::with_capacity(keyed.len());
        let mut ids = SortedEntries::with_capacity(keyed.len());
        for row in keyed {
            shows.push(row.show_major, row.offset);
            ids.push(row.episode_major, row.offset);
        }
        Ok((shows, ids, report))
    }
}

impl<I: OrderedIndex> EpisodeIndex<I> {
    /// Wraps already built show-major and episode-major indexes.
    pub fn from_indexes(shows: I, ids: I) -> Self {
        Self {
            shows,
            ids,
            report: None,
        }
    }

    /// Every episode of `show_id`, ordered by season then episode number.
    /// Episodes without a season (or number) come after numbered ones.
    pub fn episodes_by_show(&self, show_id: &str) -> IndexResult<Vec<Episode>> {
        let prefix = match id_prefix(show_id) {
            Ok(prefix) => prefix,
            Err(_) => return Ok(Vec::new()),
        };
        scan_prefix(&self.shows, &prefix, None, decode_show_major)
    }

    /// Every episode of one season of `show_id`, ordered by episode number.
    pub fn episodes_by_season(&self, show_id: &str, season: u32) -> IndexResult<Vec<Episode>> {
        // The sentinel encodes "no season"; no present season equals it.
        if season == ABSENT_U32 {
            return Ok(Vec::new());
        }
        let prefix = match season_prefix(show_id, season) {
            Ok(prefix) => prefix,
            Err(_) => return Ok(Vec::new()),
        };
        scan_prefix(&self.shows, &prefix, None, decode_show_major)
    }

    /// The episode with identifier `id`, if indexed.
    pub fn episode_by_id(&self, id: &str) -> IndexResult<Option<Episode>> {
        let prefix = match id_prefix(id) {
            Ok(prefix) => prefix,
            Err(_) => return Ok(None),
        };
        let mut found = scan_prefix(&self.ids, &prefix, Some(1), decode_episode_major)?;
        Ok(found.pop())
    }

    /// Number of indexed episodes
    pub fn len(&self) -> u64 {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn resolve_policy(&self) -> ResolvePolicy {
        ResolvePolicy::KeyEmbedded
    }

    /// Report of the build that produced this handle, if it did
    pub fn report(&self) -> Option<&BuildReport> {
        self.report.as_ref()
    }
}
