//! Atomic file publication
//!
//! Sealed files become visible to readers only when complete:
//! 1. Write to a uniquely named temp file in the target directory
//! 2. fsync the temp file ([`AtomicFile::seal`])
//! 3. Rename over the final name, atomic on POSIX ([`SealedFile::publish`])
//! 4. fsync the directory so the rename survives a crash
//!
//! Sealing and publishing are separate so that a build producing several
//! files can seal all of them before renaming any. A file dropped before it
//! is published removes its temp file, leaving any previously published
//! file untouched.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

const WRITE_BUFFER: usize = 1 << 20;

/// A file under construction that is published atomically on commit.
pub struct AtomicFile {
    final_path: PathBuf,
    temp_path: PathBuf,
    writer: BufWriter<File>,
    sealed: bool,
}

impl AtomicFile {
    /// Creates the temp file next to `final_path`.
    pub fn create(final_path: &Path) -> io::Result<Self> {
        let file_name = final_path
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?
            .to_string_lossy()
            .into_owned();
        let temp_path =
            final_path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)?;

        Ok(Self {
            final_path: final_path.to_path_buf(),
            temp_path,
            writer: BufWriter::with_capacity(WRITE_BUFFER, file),
            sealed: false,
        })
    }

    /// Final destination of this file
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Temp location written until publish
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Flushes and syncs the temp file without making it visible.
    pub fn seal(mut self) -> io::Result<SealedFile> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.sealed = true;
        Ok(SealedFile {
            final_path: std::mem::take(&mut self.final_path),
            temp_path: std::mem::take(&mut self.temp_path),
            published: false,
        })
    }

    /// Seals and publishes in one step.
    pub fn commit(self) -> io::Result<()> {
        self.seal()?.publish().map(|_| ())
    }
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.writer.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl Drop for AtomicFile {
    fn drop(&mut self) {
        if !self.sealed {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

/// A complete, synced file still under its temp name.
#[derive(Debug)]
pub struct SealedFile {
    final_path: PathBuf,
    temp_path: PathBuf,
    published: bool,
}

impl SealedFile {
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Renames the temp file over the final path and returns that path.
    pub fn publish(mut self) -> io::Result<PathBuf> {
        fs::rename(&self.temp_path, &self.final_path)?;
        self.published = true;

        if let Some(parent) = self.final_path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }
        Ok(std::mem::take(&mut self.final_path))
    }
}

impl Drop for SealedFile {
    fn drop(&mut self) {
        if !self.published {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

/// Writes `contents` to `path` atomically.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    seal_bytes(path, contents)?.publish().map(|_| ())
}

/// Writes `contents` to a sealed temp file destined for `path`.
pub fn seal_bytes(path: &Path, contents: &[u8]) -> io::Result<SealedFile> {
    let mut file = AtomicFile::create(path)?;
    file.write_all(contents)?;
    file.seal()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_not_visible_until_commit() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("ratings.idx");

        let mut file = AtomicFile::create(&target).unwrap();
        file.write_all(b"partial").unwrap();
        assert!(!target.exists());
        assert!(file.temp_path().exists());

        file.commit().unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"partial");
        assert_eq!(dir_entries(tmp.path()), vec!["ratings.idx".to_string()]);
    }

    #[test]
    fn test_drop_discards_temp_and_keeps_old_file() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("ratings.idx");
        write_atomic(&target, b"old").unwrap();

        {
            let mut file = AtomicFile::create(&target).unwrap();
            file.write_all(b"new but abandoned").unwrap();
        }

        assert_eq!(fs::read(&target).unwrap(), b"old");
        assert_eq!(dir_entries(tmp.path()), vec!["ratings.idx".to_string()]);
    }

    #[test]
    fn test_commit_replaces_existing() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("a.json");
        write_atomic(&target, b"one").unwrap();
        write_atomic(&target, b"two").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"two");
    }

    #[test]
    fn test_sealed_file_invisible_until_published() {
        let tmp = TempDir::new().unwrap();
        let index = tmp.path().join("akas.idx");
        let backing = tmp.path().join("akas.tsv");
        write_atomic(&index, b"old index").unwrap();
        write_atomic(&backing, b"old rows").unwrap();

        let sealed_backing = seal_bytes(&backing, b"new rows").unwrap();
        let sealed_index = seal_bytes(&index, b"new index").unwrap();
        assert!(sealed_backing.temp_path().exists());
        assert_eq!(fs::read(&backing).unwrap(), b"old rows");

        // Abandoning one staged file discards both temps; nothing moved
        drop(sealed_index);
        drop(sealed_backing);
        assert_eq!(fs::read(&index).unwrap(), b"old index");
        assert_eq!(fs::read(&backing).unwrap(), b"old rows");
        assert_eq!(
            dir_entries(tmp.path()),
            vec!["akas.idx".to_string(), "akas.tsv".to_string()]
        );

        let published = seal_bytes(&backing, b"new rows").unwrap().publish().unwrap();
        assert_eq!(published, backing);
        assert_eq!(fs::read(&backing).unwrap(), b"new rows");
    }
}
