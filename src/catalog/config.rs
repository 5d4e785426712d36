//! Index configuration
//!
//! Loaded from a JSON file. Only `data_dir` and `index_dir` are required:
//!
//! ```json
//! {
//!   "data_dir": "/srv/imdb/data",
//!   "index_dir": "/srv/imdb/index",
//!   "datasets": { "akas": "title.akas.tsv" },
//!   "build": { "max_report_samples": 16 },
//!   "open": { "verify_checksums": true },
//!   "log_level": "warn"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{BuildOptions, OpenOptions, DEFAULT_MAX_REPORT_SAMPLES};
use crate::errors::{IndexError, IndexResult};
use crate::observability::{log_event_with_fields, Event, Severity};

/// Source file names inside `data_dir`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetFiles {
    #[serde(default = "default_akas")]
    pub akas: String,
    #[serde(default = "default_episodes")]
    pub episodes: String,
    #[serde(default = "default_ratings")]
    pub ratings: String,
}

impl Default for DatasetFiles {
    fn default() -> Self {
        Self {
            akas: default_akas(),
            episodes: default_episodes(),
            ratings: default_ratings(),
        }
    }
}

fn default_akas() -> String {
    "title.akas.tsv".to_string()
}
fn default_episodes() -> String {
    "title.episode.tsv".to_string()
}
fn default_ratings() -> String {
    "title.ratings.tsv".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSettings {
    #[serde(default = "default_max_report_samples")]
    pub max_report_samples: usize,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            max_report_samples: DEFAULT_MAX_REPORT_SAMPLES,
        }
    }
}

fn default_max_report_samples() -> usize {
    DEFAULT_MAX_REPORT_SAMPLES
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSettings {
    /// Full crc pass over every index and companion file at open
    #[serde(default)]
    pub verify_checksums: bool,
}

/// Configuration of one set of indexes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory holding the source datasets
    pub data_dir: PathBuf,

    /// Directory the indexes are published into
    pub index_dir: PathBuf,

    #[serde(default)]
    pub datasets: DatasetFiles,

    #[serde(default)]
    pub build: BuildSettings,

    #[serde(default)]
    pub open: OpenSettings,

    /// Minimum logged severity (default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl IndexConfig {
    /// Configuration with every optional field at its default.
    pub fn new(data_dir: impl Into<PathBuf>, index_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            index_dir: index_dir.into(),
            datasets: DatasetFiles::default(),
            build: BuildSettings::default(),
            open: OpenSettings::default(),
            log_level: default_log_level(),
        }
    }

    /// Loads and validates the configuration at `path`.
    pub fn load(path: &Path) -> IndexResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            IndexError::config_invalid(format!("failed to read config: {}", e)).with_path(path)
        })?;
        let config: IndexConfig = serde_json::from_str(&content).map_err(|e| {
            IndexError::config_invalid(format!("invalid config JSON: {}", e)).with_path(path)
        })?;
        config.validate()?;

        let path_display = path.display().to_string();
        let index_dir = config.index_dir.display().to_string();
        log_event_with_fields(
            Event::ConfigLoaded,
            &[
                ("index_dir", index_dir.as_str()),
                ("path", path_display.as_str()),
            ],
        );
        Ok(config)
    }

    pub fn validate(&self) -> IndexResult<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(IndexError::config_invalid("data_dir must not be empty"));
        }
        if self.index_dir.as_os_str().is_empty() {
            return Err(IndexError::config_invalid("index_dir must not be empty"));
        }

        for (field, name) in [
            ("datasets.akas", &self.datasets.akas),
            ("datasets.episodes", &self.datasets.episodes),
            ("datasets.ratings", &self.datasets.ratings),
        ] {
            if name.is_empty() {
                return Err(IndexError::config_invalid(format!(
                    "{} must not be empty",
                    field
                )));
            }
        }

        if self.severity().is_none() {
            return Err(IndexError::config_invalid(format!(
                "invalid log_level: '{}'. Must be one of trace, info, warn, error, fatal.",
                self.log_level
            )));
        }
        Ok(())
    }

    /// Parsed `log_level`
    pub fn severity(&self) -> Option<Severity> {
        Severity::parse(&self.log_level)
    }

    pub fn akas_path(&self) -> PathBuf {
        self.data_dir.join(&self.datasets.akas)
    }

    pub fn episodes_path(&self) -> PathBuf {
        self.data_dir.join(&self.datasets.episodes)
    }

    pub fn ratings_path(&self) -> PathBuf {
        self.data_dir.join(&self.datasets.ratings)
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            max_report_samples: self.build.max_report_samples,
        }
    }

    pub fn open_options(&self) -> OpenOptions {
        OpenOptions {
            verify_checksums: self.open.verify_checksums,
        }
    }
}
