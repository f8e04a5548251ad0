//! File-based locking to prevent overlapping backup runs

use anyhow::{Context, Result};
use fd_lock::{RwLock, RwLockWriteGuard};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Advisory lock file shared by every run on this machine
pub struct RunLock {
    lock: RwLock<File>,
    path: PathBuf,
}

impl RunLock {
    /// Open (creating if needed) the lock file
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create lock directory")?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("Failed to open lock file: {:?}", path))?;

        debug!("Opened lock file: {:?}", path);

        Ok(Self {
            lock: RwLock::new(file),
            path: path.to_path_buf(),
        })
    }

    /// Take the exclusive lock, failing if another run holds it
    ///
    /// The lock is held until the returned guard is dropped.
    pub fn try_acquire(&mut self) -> Result<RwLockWriteGuard<'_, File>> {
        let guard = self
            .lock
            .try_write()
            .with_context(|| format!("Another backup run holds the lock {:?}", self.path))?;

        info!("Acquired backup lock: {:?}", self.path);
        Ok(guard)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
