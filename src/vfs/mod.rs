//! Filesystem abstraction used by every pipeline stage.
//!
//! Each stage scans a directory into an inventory of [`FileEntry`] values,
//! computes a plan from that inventory, and applies the plan through the
//! [`DatasetFs`] trait. [`OsFs`] talks to the real disk; [`MemoryFs`] keeps
//! everything in memory so the planning and apply logic can be tested
//! without touching real paths.

mod memory;

pub use memory::MemoryFs;

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::DataprepError;

/// A visible regular file found by a directory scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    /// Full path of the file.
    pub path: PathBuf,
    /// File name including extension.
    pub name: String,
    /// Size in bytes at scan time.
    pub len: u64,
}

impl FileEntry {
    pub fn new(path: impl Into<PathBuf>, len: u64) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name, len }
    }

    /// File name without its final extension.
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(0) | None => &self.name,
            Some(idx) => &self.name[..idx],
        }
    }

    /// Lower-cased final extension, if any.
    pub fn extension(&self) -> Option<String> {
        match self.name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(self.name[idx + 1..].to_ascii_lowercase()),
        }
    }

    /// True if the lower-cased extension is one of `allowed`.
    pub fn has_extension(&self, allowed: &[&str]) -> bool {
        self.extension()
            .is_some_and(|ext| allowed.iter().any(|a| *a == ext))
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Returns true for dot-files such as `.DS_Store`.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Operations the pipeline needs from a filesystem.
///
/// Implementations must be shareable across the conversion worker pool.
pub trait DatasetFs: Send + Sync {
    /// True if `path` is an existing directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Non-recursive listing of the visible regular files in `dir`.
    ///
    /// Subdirectories (quarantine folders included) and hidden entries are
    /// never returned. Entries are sorted by file name.
    fn list_files(&self, dir: &Path) -> Result<Vec<FileEntry>, DataprepError>;

    /// Size of a regular file, or `None` if it does not exist.
    fn file_len(&self, path: &Path) -> Option<u64>;

    fn read(&self, path: &Path) -> Result<Vec<u8>, DataprepError>;

    /// Create or truncate `path` with `contents`.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), DataprepError>;

    fn remove_file(&self, path: &Path) -> Result<(), DataprepError>;

    /// Move a file, creating the destination's parent directory on demand.
    /// Fails with [`DataprepError::TargetExists`] if `to` is already taken.
    fn relocate(&self, from: &Path, to: &Path) -> Result<(), DataprepError>;
}

/// [`DatasetFs`] backed by the real filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsFs;

impl DatasetFs for OsFs {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_files(&self, dir: &Path) -> Result<Vec<FileEntry>, DataprepError> {
        let mut files = Vec::new();

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|source| DataprepError::DirectoryScan {
                path: dir.to_path_buf(),
                message: source.to_string(),
            })?;

            if !entry.file_type().is_file() {
                continue;
            }
            if is_hidden(&entry.file_name().to_string_lossy()) {
                continue;
            }

            let len = entry
                .metadata()
                .map_err(|source| DataprepError::DirectoryScan {
                    path: entry.path().to_path_buf(),
                    message: source.to_string(),
                })?
                .len();
            files.push(FileEntry::new(entry.path(), len));
        }

        Ok(files)
    }

    fn file_len(&self, path: &Path) -> Option<u64> {
        fs::metadata(path)
            .ok()
            .filter(|meta| meta.is_file())
            .map(|meta| meta.len())
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, DataprepError> {
        fs::read(path).map_err(|source| DataprepError::io_at(path, source))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), DataprepError> {
        fs::write(path, contents).map_err(|source| DataprepError::io_at(path, source))
    }

    fn remove_file(&self, path: &Path) -> Result<(), DataprepError> {
        fs::remove_file(path).map_err(|source| DataprepError::io_at(path, source))
    }

    fn relocate(&self, from: &Path, to: &Path) -> Result<(), DataprepError> {
        if fs::symlink_metadata(to).is_ok() {
            return Err(DataprepError::TargetExists {
                path: to.to_path_buf(),
            });
        }
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|source| DataprepError::io_at(parent, source))?;
        }
        fs::rename(from, to).map_err(|source| DataprepError::io_at(from, source))
    }
}
