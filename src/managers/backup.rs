//! Backup task - exports journal entries and uploads them to the cloud

use crate::config::Config;
use crate::journal::{EntryRepository, JsonEntryRepository};
use crate::managers::crash::{CrashReporter, FileCrashReporter};
use crate::managers::notification::{sink_from_config, NotificationDispatcher, NotificationSink};
use crate::utils::cloud::{CloudProvider, UploadError, UploadResult};
use crate::utils::dropbox::DropboxUploader;
use crate::utils::exporter::{CsvExporter, EntryExporter, ExportError, ExportResult};
use crate::utils::settings::{FileSettingsStore, SettingsStore};
use crate::utils::temp_file::ScopedTempFile;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Terminal status reported back to the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failure,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success)
    }

    /// Process exit code for the outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            TaskOutcome::Success => 0,
            TaskOutcome::Failure => 1,
        }
    }
}

/// Collaborators the backup task depends on
pub struct BackupDeps {
    pub repository: Arc<dyn EntryRepository>,
    pub cloud_provider: Arc<dyn CloudProvider>,
    pub crash_reporter: Arc<dyn CrashReporter>,
    pub settings: Arc<dyn SettingsStore>,
    pub notifications: NotificationDispatcher,
}

/// Runs one export-and-upload cycle per call to [`BackupTask::run`]
///
/// Assumes the scheduler never runs two instances over the same data at once;
/// the CLI enforces this with a lock file.
pub struct BackupTask {
    repository: Arc<dyn EntryRepository>,
    cloud_provider: Arc<dyn CloudProvider>,
    crash_reporter: Arc<dyn CrashReporter>,
    settings: Arc<dyn SettingsStore>,
    notifications: NotificationDispatcher,
    exporter: Arc<dyn EntryExporter>,
    cache_dir: PathBuf,
}

impl BackupTask {
    pub fn new(deps: BackupDeps, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            repository: deps.repository,
            cloud_provider: deps.cloud_provider,
            crash_reporter: deps.crash_reporter,
            settings: deps.settings,
            notifications: deps.notifications,
            exporter: Arc::new(CsvExporter),
            cache_dir: cache_dir.into(),
        }
    }

    /// Replace the CSV exporter
    pub fn with_exporter(mut self, exporter: Arc<dyn EntryExporter>) -> Self {
        self.exporter = exporter;
        self
    }

    /// Wire the concrete collaborators described by the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let sink = sink_from_config(&config.notifications)?;
        Self::from_config_with_sink(config, sink)
    }

    /// Wire concrete collaborators but deliver notifications to `sink`
    pub fn from_config_with_sink(config: &Config, sink: Arc<dyn NotificationSink>) -> Result<Self> {
        let settings: Arc<dyn SettingsStore> =
            Arc::new(FileSettingsStore::new(&config.settings.settings_file));

        let deps = BackupDeps {
            repository: Arc::new(JsonEntryRepository::new(&config.repository.entries_file)),
            cloud_provider: Arc::new(DropboxUploader::new(
                config.dropbox.clone(),
                settings.clone(),
            )?),
            crash_reporter: Arc::new(FileCrashReporter::new(
                &config.crash_reporting.crash_log_file,
            )),
            settings,
            notifications: NotificationDispatcher::new(config.notifications.clone(), sink),
        };

        Ok(Self::new(deps, &config.global.cache_dir))
    }

    /// Run the backup once
    pub async fn run(&self) -> TaskOutcome {
        let start_time = Instant::now();

        let entries = match self.repository.get_entries().await {
            Ok(entries) => entries,
            Err(e) => {
                error!("Failed to read journal entries: {:#}", e);
                return TaskOutcome::Failure;
            }
        };

        if entries.is_empty() {
            info!("No journal entries to back up");
            return TaskOutcome::Success;
        }

        info!("Backing up {} journal entries", entries.len());

        // Deleted on every return below, and when this future is dropped
        let temp_file = match ScopedTempFile::create_in(&self.cache_dir) {
            Ok(file) => file,
            Err(e) => {
                error!("Failed to create temporary export file: {:#}", e);
                return TaskOutcome::Failure;
            }
        };

        let file = match self.export(&temp_file, entries).await {
            ExportResult::Created(file) => file,
            ExportResult::Failed(e) => {
                warn!("Failed to export journal entries: {}", e);
                return TaskOutcome::Failure;
            }
        };

        info!("Uploading backup to {}", self.cloud_provider.name());

        let outcome = match self.cloud_provider.upload_to_cloud(&file).await {
            UploadResult::Success => TaskOutcome::Success,
            UploadResult::Failure(cause) => {
                self.handle_upload_failure(&cause).await;
                TaskOutcome::Failure
            }
        };

        if let Err(e) = temp_file.release() {
            warn!("{:#}", e);
        }

        info!(
            "Backup finished with {:?} in {:.2}s",
            outcome,
            start_time.elapsed().as_secs_f64()
        );

        outcome
    }

    /// Write the entries into the temporary file off the async threads
    async fn export(
        &self,
        temp_file: &ScopedTempFile,
        entries: Vec<crate::journal::JournalEntry>,
    ) -> ExportResult {
        // Opened here so a cancelled run cannot recreate the file after its guard deleted it
        let file = match tokio::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(temp_file.path())
            .await
        {
            Ok(file) => file.into_std().await,
            Err(e) => return ExportResult::Failed(ExportError::Io(e)),
        };
        let path = temp_file.path().to_path_buf();
        let exporter = self.exporter.clone();

        let joined =
            tokio::task::spawn_blocking(move || exporter.export(&entries, file, &path)).await;

        match joined {
            Ok(result) => result,
            Err(e) => ExportResult::Failed(ExportError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("export worker failed: {}", e),
            ))),
        }
    }

    async fn handle_upload_failure(&self, cause: &UploadError) {
        warn!("Upload to {} failed: {}", self.cloud_provider.name(), cause);

        // Independent checks: one failure may need both notifications
        if cause.is_auth_failure() {
            if let Err(e) = self.notifications.send_auth_failure().await {
                warn!("Failed to send re-authorization notification: {:#}", e);
            }
            match self.settings.revoke_authorization().await {
                Ok(()) => info!("Revoked stored {} authorization", self.cloud_provider.name()),
                Err(e) => warn!("Failed to revoke authorization: {:#}", e),
            }
        }

        if cause.is_insufficient_space() {
            if let Err(e) = self.notifications.send_storage_full().await {
                warn!("Failed to send storage full notification: {:#}", e);
            }
        }

        self.crash_reporter.log_handled_exception(cause).await;
    }
}
