//! Scoped temporary export file
//!
//! The file is deleted when the guard is released or dropped, which covers early
//! returns, panics and cancellation of the future owning it.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, warn};

/// Prefix of every temporary export file
pub const TEMP_FILE_PREFIX: &str = "tempJournalBackup";

/// Guard owning a uniquely named temporary file
pub struct ScopedTempFile {
    path: PathBuf,
    temp: Option<TempPath>,
}

impl ScopedTempFile {
    /// Create an empty, uniquely named file inside `dir`
    pub fn create_in(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create cache directory: {:?}", dir))?;

        let file = tempfile::Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .suffix(".csv")
            .tempfile_in(dir)
            .with_context(|| format!("Failed to create temporary file in {:?}", dir))?;

        let temp = file.into_temp_path();
        let path = temp.to_path_buf();
        debug!("Created temporary file: {:?}", path);

        Ok(Self {
            path,
            temp: Some(temp),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now, reporting failures
    pub fn release(mut self) -> Result<()> {
        match self.temp.take() {
            Some(temp) => {
                temp.close()
                    .with_context(|| format!("Failed to delete temporary file: {:?}", self.path))?;
                debug!("Released temporary file: {:?}", self.path);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for ScopedTempFile {
    fn drop(&mut self) {
        if let Some(temp) = self.temp.take() {
            match temp.close() {
                Ok(()) => debug!("Released temporary file: {:?}", self.path),
                Err(e) => warn!("Failed to delete temporary file {:?}: {}", self.path, e),
            }
        }
    }
}
