//! Build manifests
//!
//! Each domain build ends by writing `<domain>.manifest.json` next to its
//! files. The manifest lists every file the build produced with its length
//! and crc32, so an open can tell when an index and its companion files no
//! longer come from the same build. It is written atomically and lives
//! outside the sealed files, which keeps index bytes deterministic.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backing::ResolvePolicy;
use crate::errors::{IndexError, IndexErrorCode, IndexResult};
use crate::observability::{log_event_with_fields, Event};
use crate::pipeline::BuildReport;
use crate::table::{seal_bytes, SealedFile};

/// Manifest schema version
pub const MANIFEST_VERSION: u32 = 1;

const READ_CHUNK: usize = 64 * 1024;

/// One produced file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub name: String,
    pub len: u64,
    pub crc32: u32,
}

impl ManifestFile {
    /// Measures `dir/name` as it is on disk now.
    pub fn describe(dir: &Path, name: &str) -> io::Result<Self> {
        let (len, crc32) = file_crc(&dir.join(name))?;
        Ok(Self {
            name: name.to_string(),
            len,
            crc32,
        })
    }
}

/// Record of one domain build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildManifest {
    pub format_version: u32,
    pub domain: String,
    pub build_id: Uuid,
    pub built_at: DateTime<Utc>,
    /// File name of the source the build read
    pub source: String,
    pub resolve_policy: ResolvePolicy,
    pub report: BuildReport,
    pub files: Vec<ManifestFile>,
}

impl BuildManifest {
    pub fn new(domain: &str, source: &Path, policy: ResolvePolicy, report: &BuildReport) -> Self {
        Self {
            format_version: MANIFEST_VERSION,
            domain: domain.to_string(),
            build_id: Uuid::new_v4(),
            built_at: Utc::now(),
            source: source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            resolve_policy: policy,
            report: report.clone(),
            files: Vec::new(),
        }
    }

    /// Manifest file name for `domain`
    pub fn file_name(domain: &str) -> String {
        format!("{}.manifest.json", domain)
    }

    pub fn path(dir: &Path, domain: &str) -> PathBuf {
        dir.join(Self::file_name(domain))
    }

    /// Adds a produced file, measuring it on disk.
    pub fn add_file(&mut self, dir: &Path, name: &str) -> IndexResult<()> {
        let file = ManifestFile::describe(dir, name).map_err(|e| {
            IndexError::build_io("failed to measure produced file", &dir.join(name), e)
        })?;
        self.files.push(file);
        Ok(())
    }

    /// Adds a sealed file that will be published as `name`, measuring its
    /// temp copy.
    pub fn add_staged(&mut self, name: &str, temp_path: &Path) -> IndexResult<()> {
        let (len, crc32) = file_crc(temp_path).map_err(|e| {
            IndexError::build_io("failed to measure produced file", temp_path, e)
        })?;
        self.files.push(ManifestFile {
            name: name.to_string(),
            len,
            crc32,
        });
        Ok(())
    }

    /// Seals the manifest under a temp name in `dir` without publishing it.
    pub fn stage(&self, dir: &Path) -> IndexResult<SealedFile> {
        let path = Self::path(dir, &self.domain);
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| IndexError::build_failed(format!("failed to encode manifest: {}", e)))?;
        seal_bytes(&path, &json)
            .map_err(|e| IndexError::build_io("failed to stage manifest", &path, e))
    }

    /// Publishes the manifest atomically into `dir`.
    pub fn write(&self, dir: &Path) -> IndexResult<PathBuf> {
        let path = Self::path(dir, &self.domain);
        self.stage(dir)?
            .publish()
            .map_err(|e| IndexError::build_io("failed to publish manifest", &path, e))
    }

    /// Loads the manifest for `domain`; `None` when there is none.
    pub fn load(dir: &Path, domain: &str) -> IndexResult<Option<Self>> {
        let path = Self::path(dir, domain);
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(IndexError::open_failed("failed to read manifest", &path, e)),
        };
        let manifest: BuildManifest = serde_json::from_slice(&content).map_err(|e| {
            IndexError::new(
                IndexErrorCode::IndexCorruption,
                format!("invalid manifest JSON: {}", e),
            )
            .with_path(&path)
        })?;
        if manifest.format_version != MANIFEST_VERSION || manifest.domain != domain {
            return Err(IndexError::new(
                IndexErrorCode::IndexCorruption,
                format!(
                    "manifest is version {} for domain '{}', expected version {} for '{}'",
                    manifest.format_version, manifest.domain, MANIFEST_VERSION, domain
                ),
            )
            .with_path(&path));
        }
        Ok(Some(manifest))
    }

    /// Checks every listed file against the disk. Lengths are always
    /// compared; checksums only when `verify_crc` is set.
    pub fn verify(&self, dir: &Path, verify_crc: bool) -> IndexResult<()> {
        for expected in &self.files {
            let path = dir.join(&expected.name);
            let len = fs::metadata(&path)
                .map_err(|e| {
                    IndexError::backing_desync(format!(
                        "file listed by build {} is unreadable: {}",
                        self.build_id, e
                    ))
                    .with_path(&path)
                })?
                .len();
            if len != expected.len {
                return Err(IndexError::backing_desync(format!(
                    "file is {} bytes, build {} produced {}",
                    len, self.build_id, expected.len
                ))
                .with_path(&path));
            }
            if verify_crc {
                let (_, crc) = file_crc(&path)
                    .map_err(|e| IndexError::open_failed("failed to read file", &path, e))?;
                if crc != expected.crc32 {
                    return Err(IndexError::backing_desync(format!(
                        "crc32 {:08x} differs from {:08x} recorded by build {}",
                        crc, expected.crc32, self.build_id
                    ))
                    .with_path(&path));
                }
            }
        }
        Ok(())
    }
}

/// Loads and verifies the manifest of `domain`, logging the outcome.
///
/// A missing manifest is tolerated with a warning.
pub(crate) fn check_manifest(
    dir: &Path,
    domain: &str,
    verify_crc: bool,
) -> IndexResult<Option<BuildManifest>> {
    let manifest = match BuildManifest::load(dir, domain)? {
        Some(manifest) => manifest,
        None => {
            let dir_display = dir.display().to_string();
            log_event_with_fields(
                Event::ManifestMissing,
                &[("dir", dir_display.as_str()), ("domain", domain)],
            );
            return Ok(None);
        }
    };
    if let Err(e) = manifest.verify(dir, verify_crc) {
        let reason = e.to_string();
        log_event_with_fields(
            Event::BackingStoreDesync,
            &[("domain", domain), ("reason", reason.as_str())],
        );
        return Err(e);
    }
    Ok(Some(manifest))
}

fn file_crc(path: &Path) -> io::Result<(u64, u32)> {
    let mut file = File::open(path)?;
    let mut hasher = Hasher::new();
    let mut buf = vec![0u8; READ_CHUNK];
    let mut len = 0u64;
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        len += n as u64;
    }
    Ok((len, hasher.finalize()))
}
