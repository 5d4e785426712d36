//! Shared helpers for integration tests
//!
//! Fixtures live in `testdata/` and are copied into a fresh temp directory
//! per test, so builds never write next to the checked-in files.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use imdb_index::IndexConfig;
use tempfile::TempDir;

pub const AKAS: &str = "title.akas.tsv";
pub const EPISODES: &str = "title.episode.tsv";
pub const RATINGS: &str = "title.ratings.tsv";

/// A temp directory holding a copy of the fixtures under `data/`.
pub struct Fixture {
    pub tmp: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("data");
        fs::create_dir_all(&data).unwrap();
        for name in [AKAS, EPISODES, RATINGS] {
            fs::copy(fixture_path(name), data.join(name)).unwrap();
        }
        Self { tmp }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.tmp.path().join("data")
    }

    pub fn data(&self, name: &str) -> PathBuf {
        self.data_dir().join(name)
    }

    /// Index directory `index-<n>`, distinct per caller-chosen suffix
    pub fn index_dir(&self, suffix: &str) -> PathBuf {
        self.tmp.path().join(format!("index-{}", suffix))
    }

    pub fn config(&self, suffix: &str) -> IndexConfig {
        IndexConfig::new(self.data_dir(), self.index_dir(suffix))
    }
}

pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata").join(name)
}

/// Data rows of a fixture, header excluded, split into fields.
pub fn fixture_rows(name: &str) -> Vec<Vec<String>> {
    let content = fs::read_to_string(fixture_path(name)).unwrap();
    content
        .lines()
        .skip(1)
        .map(|line| line.split('\t').map(str::to_string).collect())
        .collect()
}

/// Names of temp files left behind in `dir`.
pub fn temp_files(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with('.') && name.ends_with(".tmp"))
        .collect()
}
