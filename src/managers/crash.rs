//! Crash reporting sink for handled (non-fatal) errors

use crate::utils::cloud::UploadError;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{error, warn};

/// Fire-and-forget sink for handled errors
#[async_trait]
pub trait CrashReporter: Send + Sync {
    async fn log_handled_exception(&self, cause: &UploadError);
}

/// One line of the crash log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashRecord {
    pub timestamp: String,
    pub kind: String,
    pub message: String,
    pub fatal: bool,
}

/// Appends handled errors to a JSON-lines file
pub struct FileCrashReporter {
    path: PathBuf,
}

impl FileCrashReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, record: &CrashRecord) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl CrashReporter for FileCrashReporter {
    async fn log_handled_exception(&self, cause: &UploadError) {
        error!(kind = cause.kind(), "Handled exception: {}", cause);

        let record = CrashRecord {
            timestamp: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            kind: cause.kind().to_string(),
            message: cause.message().to_string(),
            fatal: false,
        };

        // The sink never fails the caller
        if let Err(e) = self.append(&record).await {
            warn!("Failed to write crash log {:?}: {}", self.path, e);
        }
    }
}

/// Mock implementation for testing
/// Available for use in external test crates
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct MockCrashReporter {
        pub reports: Arc<Mutex<Vec<UploadError>>>,
    }

    impl MockCrashReporter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn get_reports(&self) -> Vec<UploadError> {
            self.reports.lock().unwrap().clone()
        }

        pub fn report_count(&self) -> usize {
            self.reports.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CrashReporter for MockCrashReporter {
        async fn log_handled_exception(&self, cause: &UploadError) {
            self.reports.lock().unwrap().push(cause.clone());
        }
    }
}
