//! Catalog: the three domain indexes behind one configuration
//!
//! `create_all` builds akas, episodes and ratings concurrently on tokio's
//! blocking pool. The builds share nothing but the index directory and
//! write disjoint files, so they need no coordination. The first failure
//! wins; builds still running finish in the background and publish their
//! own files, which is harmless since every publish is atomic.

mod config;

pub use config::{BuildSettings, DatasetFiles, IndexConfig, OpenSettings};

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::task::{self, JoinError};

use crate::backing::ResolvePolicy;
use crate::domain::{
    ensure_dir, AkaIndex, BuildOptions, EpisodeIndex, RatingIndex, AKA_DOMAIN, EPISODE_DOMAIN,
    RATING_DOMAIN,
};
use crate::errors::{IndexError, IndexResult};
use crate::observability::{log_event_with_fields, Event};
use crate::pipeline::BuildReport;

/// Opened indexes for every domain
pub struct Catalog {
    pub akas: AkaIndex,
    pub episodes: EpisodeIndex,
    pub ratings: RatingIndex,
    index_dir: PathBuf,
}

/// Per-domain summary returned by [`Catalog::describe`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainSummary {
    pub domain: &'static str,
    pub entries: u64,
    pub resolve_policy: ResolvePolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<BuildReport>,
}

impl Catalog {
    /// Builds every domain from `config.data_dir` into `config.index_dir`
    /// and returns the opened catalog.
    pub async fn create_all(config: &IndexConfig) -> IndexResult<Self> {
        ensure_dir(&config.index_dir)?;
        let options = config.build_options();

        let akas = spawn_build(
            config.akas_path(),
            config.index_dir.clone(),
            options.clone(),
            AkaIndex::create,
        );
        let episodes = spawn_build(
            config.episodes_path(),
            config.index_dir.clone(),
            options.clone(),
            EpisodeIndex::create,
        );
        let ratings = spawn_build(
            config.ratings_path(),
            config.index_dir.clone(),
            options,
            RatingIndex::create,
        );

        let (akas, episodes, ratings) = tokio::try_join!(akas, episodes, ratings)?;
        let catalog = Self {
            akas,
            episodes,
            ratings,
            index_dir: config.index_dir.clone(),
        };
        catalog.log_ready("built");
        Ok(catalog)
    }

    /// Opens every previously built domain in `config.index_dir`.
    pub fn open(config: &IndexConfig) -> IndexResult<Self> {
        let options = config.open_options();
        let dir = &config.index_dir;
        let catalog = Self {
            akas: AkaIndex::open(dir, &options)?,
            episodes: EpisodeIndex::open(dir, &options)?,
            ratings: RatingIndex::open(dir, &options)?,
            index_dir: dir.clone(),
        };
        catalog.log_ready("opened");
        Ok(catalog)
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    /// Entry counts, resolve policies and (after a build) the reports.
    pub fn describe(&self) -> Vec<DomainSummary> {
        vec![
            DomainSummary {
                domain: AKA_DOMAIN,
                entries: self.akas.len(),
                resolve_policy: self.akas.resolve_policy(),
                report: self.akas.report().cloned(),
            },
            DomainSummary {
                domain: EPISODE_DOMAIN,
                entries: self.episodes.len(),
                resolve_policy: self.episodes.resolve_policy(),
                report: self.episodes.report().cloned(),
            },
            DomainSummary {
                domain: RATING_DOMAIN,
                entries: self.ratings.len(),
                resolve_policy: self.ratings.resolve_policy(),
                report: self.ratings.report().cloned(),
            },
        ]
    }

    fn log_ready(&self, mode: &str) {
        let dir = self.index_dir.display().to_string();
        let akas = self.akas.len().to_string();
        let episodes = self.episodes.len().to_string();
        let ratings = self.ratings.len().to_string();
        log_event_with_fields(
            Event::CatalogReady,
            &[
                ("akas", akas.as_str()),
                ("dir", dir.as_str()),
                ("episodes", episodes.as_str()),
                ("mode", mode),
                ("ratings", ratings.as_str()),
            ],
        );
    }
}

/// Runs one blocking domain build on the blocking pool.
async fn spawn_build<T, F>(
    data_path: PathBuf,
    index_dir: PathBuf,
    options: BuildOptions,
    create: F,
) -> IndexResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Path, &Path, &BuildOptions) -> IndexResult<T> + Send + 'static,
{
    task::spawn_blocking(move || create(&data_path, &index_dir, &options))
        .await
        .map_err(join_failed)?
}

fn join_failed(e: JoinError) -> IndexError {
    IndexError::build_failed(format!("build task did not complete: {}", e))
}
