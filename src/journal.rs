//! Journal entries and the repository they are read from

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A single journal entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub entry_date: NaiveDate,
    pub entry_content: String,
}

impl JournalEntry {
    pub fn new(entry_date: NaiveDate, entry_content: impl Into<String>) -> Self {
        Self {
            entry_date,
            entry_content: entry_content.into(),
        }
    }
}

/// Read-only source of the entries to back up
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntryRepository: Send + Sync {
    /// Return every entry currently stored
    async fn get_entries(&self) -> Result<Vec<JournalEntry>>;
}

/// Repository backed by a JSON array on disk
#[derive(Debug, Clone)]
pub struct JsonEntryRepository {
    path: PathBuf,
}

impl JsonEntryRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EntryRepository for JsonEntryRepository {
    async fn get_entries(&self) -> Result<Vec<JournalEntry>> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            debug!("Entries file {:?} does not exist, nothing stored yet", self.path);
            return Ok(Vec::new());
        }

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read entries file: {:?}", self.path))?;

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let entries: Vec<JournalEntry> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse entries file: {:?}", self.path))?;

        debug!("Loaded {} entries from {:?}", entries.len(), self.path);
        Ok(entries)
    }
}

/// In-memory repository for tests
/// Available for use in external test crates
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct MockEntryRepository {
        entries: Arc<Mutex<Vec<JournalEntry>>>,
        fail_with: Arc<Mutex<Option<String>>>,
        /// Number of times get_entries was called
        pub reads: Arc<Mutex<usize>>,
    }

    impl MockEntryRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_entries(entries: Vec<JournalEntry>) -> Self {
            let repo = Self::default();
            *repo.entries.lock().unwrap() = entries;
            repo
        }

        /// Make every read fail with the given message
        pub fn failing(self, message: &str) -> Self {
            *self.fail_with.lock().unwrap() = Some(message.to_string());
            self
        }

        pub fn read_count(&self) -> usize {
            *self.reads.lock().unwrap()
        }
    }

    #[async_trait]
    impl EntryRepository for MockEntryRepository {
        async fn get_entries(&self) -> Result<Vec<JournalEntry>> {
            *self.reads.lock().unwrap() += 1;
            if let Some(ref message) = *self.fail_with.lock().unwrap() {
                anyhow::bail!("{}", message);
            }
            Ok(self.entries.lock().unwrap().clone())
        }
    }
}
