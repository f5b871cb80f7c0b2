//! In-memory [`DatasetFs`] implementation.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::{is_hidden, DatasetFs, FileEntry};
use crate::error::DataprepError;

#[derive(Debug, Default)]
struct Tree {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
}

impl Tree {
    fn add_ancestors(&mut self, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() || !self.dirs.insert(dir.to_path_buf()) {
                break;
            }
            current = dir.parent();
        }
    }
}

/// A filesystem held entirely in memory.
///
/// Directories are implied by the files inside them and can also be
/// created explicitly with [`MemoryFs::create_dir`].
#[derive(Debug, Default)]
pub struct MemoryFs {
    tree: Mutex<Tree>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory (and its ancestors).
    pub fn create_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut tree = self.lock();
        tree.dirs.insert(path.to_path_buf());
        tree.add_ancestors(path);
    }

    /// Add a file, replacing any existing contents.
    pub fn insert(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) {
        let path = path.as_ref();
        let mut tree = self.lock();
        tree.add_ancestors(path);
        tree.files.insert(path.to_path_buf(), contents.into());
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.lock().files.contains_key(path.as_ref())
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.lock().files.get(path.as_ref()).cloned()
    }

    /// Every file path currently stored, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().files.keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn not_found(path: &Path) -> DataprepError {
    DataprepError::io_at(
        path,
        io::Error::new(io::ErrorKind::NotFound, "no such file"),
    )
}

impl DatasetFs for MemoryFs {
    fn is_dir(&self, path: &Path) -> bool {
        self.lock().dirs.contains(path)
    }

    fn list_files(&self, dir: &Path) -> Result<Vec<FileEntry>, DataprepError> {
        let tree = self.lock();
        if !tree.dirs.contains(dir) {
            return Err(DataprepError::DirectoryScan {
                path: dir.to_path_buf(),
                message: "directory does not exist".to_string(),
            });
        }

        Ok(tree
            .files
            .iter()
            .filter(|(path, _)| path.parent() == Some(dir))
            .map(|(path, contents)| FileEntry::new(path.clone(), contents.len() as u64))
            .filter(|entry| !is_hidden(&entry.name))
            .collect())
    }

    fn file_len(&self, path: &Path) -> Option<u64> {
        self.lock().files.get(path).map(|c| c.len() as u64)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, DataprepError> {
        self.lock()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| not_found(path))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), DataprepError> {
        let mut tree = self.lock();
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !tree.dirs.contains(parent) => {
                Err(not_found(parent))
            }
            _ => {
                tree.files.insert(path.to_path_buf(), contents.to_vec());
                Ok(())
            }
        }
    }

    fn remove_file(&self, path: &Path) -> Result<(), DataprepError> {
        self.lock()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }

    fn relocate(&self, from: &Path, to: &Path) -> Result<(), DataprepError> {
        let mut tree = self.lock();
        if tree.files.contains_key(to) || tree.dirs.contains(to) {
            return Err(DataprepError::TargetExists {
                path: to.to_path_buf(),
            });
        }
        let contents = tree.files.remove(from).ok_or_else(|| not_found(from))?;
        tree.add_ancestors(to);
        tree.files.insert(to.to_path_buf(), contents);
        Ok(())
    }
}
