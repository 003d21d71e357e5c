//! Advisory lock files for read-modify-write cycles.
//!
//! Data files are replaced or appended while they are read, so the lock lives
//! in a sidecar file next to them. Holding a [`LockFile`] serializes writers
//! across processes; plain readers never touch it.

use crate::Result;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Exclusive lock on a sidecar file, released on drop
#[derive(Debug)]
pub struct LockFile {
    file: File,
    path: PathBuf,
}

impl LockFile {
    /// Block until the exclusive lock on `path` is held, creating the file
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
        file.lock_exclusive()?;

        tracing::trace!("Acquired lock {:?}", path);
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!("Failed to release lock {:?}: {}", self.path, e);
        }
    }
}
