//! Publish Integrity Tests
//!
//! Tests for publish and pairing invariants:
//! - Builds leave no temp files behind
//! - A failed build leaves the previously published files intact
//! - An index paired with a foreign backing file is detected
//! - Corrupted index bytes are caught by the checksum pass

mod common;

use std::fs;

use common::{temp_files, Fixture, AKAS, RATINGS};
use imdb_index::domain::{
    BuildManifest, AKA_BACKING_FILE, AKA_DOMAIN, AKA_INDEX_FILE, RATING_INDEX_FILE,
};
use imdb_index::{AkaIndex, BuildOptions, IndexErrorCode, OpenOptions, RatingIndex};

const AKA_HEADER: &str =
    "titleId\tordering\ttitle\tregion\tlanguage\ttypes\tattributes\tisOriginalTitle\n";

// =============================================================================
// Atomic Publish
// =============================================================================

/// Successful builds leave only final files.
#[test]
fn test_no_temp_files_after_build() {
    let fx = Fixture::new();
    let dir = fx.index_dir("a");
    AkaIndex::create(&fx.data(AKAS), &dir, &BuildOptions::default()).unwrap();
    RatingIndex::create(&fx.data(RATINGS), &dir, &BuildOptions::default()).unwrap();

    assert!(temp_files(&dir).is_empty());
    let mut names: Vec<String> = fs::read_dir(&dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "akas.idx",
            "akas.manifest.json",
            "akas.tsv",
            "ratings.idx",
            "ratings.manifest.json"
        ]
    );
}

/// An aka id with more rows than the payload count can hold aborts the
/// build; the earlier index is still there and still answers.
#[test]
fn test_failed_build_keeps_previous_index() {
    let fx = Fixture::new();
    let dir = fx.index_dir("a");
    AkaIndex::create(&fx.data(AKAS), &dir, &BuildOptions::default()).unwrap();
    let index_before = fs::read(dir.join(AKA_INDEX_FILE)).unwrap();
    let backing_before = fs::read(dir.join(AKA_BACKING_FILE)).unwrap();

    let mut oversized = String::from(AKA_HEADER);
    for order in 0..=u16::MAX as u32 {
        oversized.push_str(&format!("tt9999999\t{}\tT\n", order));
    }
    fs::write(fx.data(AKAS), oversized).unwrap();

    let err = AkaIndex::create(&fx.data(AKAS), &dir, &BuildOptions::default())
        .err()
        .unwrap();
    assert_eq!(err.code(), IndexErrorCode::BuildIoFailed);
    assert!(err.is_fatal());

    assert!(temp_files(&dir).is_empty());
    assert_eq!(fs::read(dir.join(AKA_INDEX_FILE)).unwrap(), index_before);
    assert_eq!(fs::read(dir.join(AKA_BACKING_FILE)).unwrap(), backing_before);

    let index = AkaIndex::open(&dir, &OpenOptions { verify_checksums: true }).unwrap();
    assert_eq!(index.find("tt0000001").unwrap().len(), 3);
}

/// A key too long for the table fails the aka build after its backing file
/// is already written. Neither half of the published pair may change.
#[test]
fn test_failed_index_write_keeps_previous_pair() {
    let fx = Fixture::new();
    let dir = fx.index_dir("a");
    AkaIndex::create(&fx.data(AKAS), &dir, &BuildOptions::default()).unwrap();
    let index_before = fs::read(dir.join(AKA_INDEX_FILE)).unwrap();
    let backing_before = fs::read(dir.join(AKA_BACKING_FILE)).unwrap();
    let manifest_before = BuildManifest::load(&dir, AKA_DOMAIN).unwrap().unwrap();

    let mut source = String::from(AKA_HEADER);
    source.push_str("tt0000002\t1\tLe clown et ses chiens\t\\N\t\\N\toriginal\t\\N\t1\n");
    source.push_str(&format!("tt{}\t1\tLong\t\\N\t\\N\t\\N\t\\N\t0\n", "9".repeat(70_000)));
    fs::write(fx.data(AKAS), source).unwrap();

    let err = AkaIndex::create(&fx.data(AKAS), &dir, &BuildOptions::default())
        .err()
        .unwrap();
    assert_eq!(err.code(), IndexErrorCode::BuildIoFailed);

    assert!(temp_files(&dir).is_empty());
    assert_eq!(fs::read(dir.join(AKA_INDEX_FILE)).unwrap(), index_before);
    assert_eq!(fs::read(dir.join(AKA_BACKING_FILE)).unwrap(), backing_before);
    let manifest_after = BuildManifest::load(&dir, AKA_DOMAIN).unwrap().unwrap();
    assert_eq!(manifest_after.build_id, manifest_before.build_id);

    let index = AkaIndex::open(&dir, &OpenOptions { verify_checksums: true }).unwrap();
    assert_eq!(index.find("tt0000001").unwrap().len(), 3);
    assert_eq!(index.find("tt0000002").unwrap().len(), 2);
}

// =============================================================================
// Backing Store Pairing
// =============================================================================

/// A backing file from another build is refused at open.
#[test]
fn test_foreign_backing_file_refused_at_open() {
    let fx = Fixture::new();
    let dir = fx.index_dir("a");
    AkaIndex::create(&fx.data(AKAS), &dir, &BuildOptions::default()).unwrap();

    fs::write(
        fx.data(AKAS),
        format!("{}tt0000009\t1\tMiss Jerry\t\\N\t\\N\toriginal\t\\N\t1\n", AKA_HEADER),
    )
    .unwrap();
    let other = fx.index_dir("b");
    AkaIndex::create(&fx.data(AKAS), &other, &BuildOptions::default()).unwrap();
    fs::copy(other.join(AKA_BACKING_FILE), dir.join(AKA_BACKING_FILE)).unwrap();

    let err = AkaIndex::open(&dir, &OpenOptions::default()).err().unwrap();
    assert_eq!(err.code(), IndexErrorCode::BackingStoreDesync);
}

/// Without a manifest the pairing is still checked row by row at query
/// time.
#[test]
fn test_foreign_backing_file_caught_at_query() {
    let fx = Fixture::new();
    let dir = fx.index_dir("a");
    AkaIndex::create(&fx.data(AKAS), &dir, &BuildOptions::default()).unwrap();
    fs::remove_file(BuildManifest::path(&dir, AKA_DOMAIN)).unwrap();
    fs::write(
        dir.join(AKA_BACKING_FILE),
        format!("{}tt0000009\t1\tMiss Jerry\t\\N\t\\N\toriginal\t\\N\t1\n", AKA_HEADER),
    )
    .unwrap();

    let index = AkaIndex::open(&dir, &OpenOptions::default()).unwrap();
    for id in ["tt0000001", "tt0000005"] {
        let err = index.find(id).unwrap_err();
        assert_eq!(err.code(), IndexErrorCode::BackingStoreDesync, "id {}", id);
    }
    assert!(index.find("tt0000099").unwrap().is_empty());
}

// =============================================================================
// Corruption
// =============================================================================

/// A flipped key byte passes structural checks but not the crc pass.
#[test]
fn test_checksum_pass_detects_flipped_byte() {
    let fx = Fixture::new();
    let dir = fx.index_dir("a");
    RatingIndex::create(&fx.data(RATINGS), &dir, &BuildOptions::default()).unwrap();

    let path = dir.join(RATING_INDEX_FILE);
    let mut bytes = fs::read(&path).unwrap();
    bytes[20] ^= 0x01;
    fs::write(&path, bytes).unwrap();

    RatingIndex::open(&dir, &OpenOptions::default()).unwrap();
    let err = RatingIndex::open(&dir, &OpenOptions { verify_checksums: true })
        .err()
        .unwrap();
    assert_eq!(err.code(), IndexErrorCode::IndexCorruption);
}

/// Truncated index files fail structural validation at open.
#[test]
fn test_truncated_index_rejected() {
    let fx = Fixture::new();
    let dir = fx.index_dir("a");
    RatingIndex::create(&fx.data(RATINGS), &dir, &BuildOptions::default()).unwrap();

    let path = dir.join(RATING_INDEX_FILE);
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 5]).unwrap();

    let err = RatingIndex::open(&dir, &OpenOptions::default()).err().unwrap();
    assert_eq!(err.code(), IndexErrorCode::IndexCorruption);
}

/// Opening a directory that was never built is an open failure.
#[test]
fn test_open_unbuilt_directory() {
    let fx = Fixture::new();
    let err = AkaIndex::open(&fx.index_dir("none"), &OpenOptions::default())
        .err()
        .unwrap();
    assert_eq!(err.code(), IndexErrorCode::OpenFailed);
}
