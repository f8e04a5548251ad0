//! Test utilities for journal-backup
//!
//! This crate provides shared test utilities, mock implementations,
//! and helper functions for testing the journal-backup application.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, MockCloudProvider, sample_entries};
//!
//! #[tokio::test]
//! async fn my_test() {
//!     let (config, _temp_dir) = ConfigBuilder::new()
//!         .with_entries(&sample_entries())
//!         .persist();
//!     // ... test code
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::ConfigBuilder;
pub use fixtures::*;
pub use test_context::{
    leftover_exports, read_json_lines, OptionAssertions, ResultAssertions, TestContext,
};

// Re-export types from the main crate for convenience
pub use journal_backup::config::{
    Config, CrashReportingConfig, DropboxConfig, GlobalConfig, NotificationConfig,
    RepositoryConfig, SettingsConfig,
};
pub use journal_backup::managers::backup::{BackupDeps, BackupTask, TaskOutcome};
pub use journal_backup::managers::notification::{
    Notification, NotificationDispatcher, NotificationKind, NotificationTray,
};
pub use journal_backup::utils::cloud::{FailureClass, UploadError, UploadResult};
pub use journal_backup::JournalEntry;

// Re-export mock implementations from the main crate
pub use journal_backup::journal::mock::MockEntryRepository;
pub use journal_backup::managers::crash::mock::MockCrashReporter;
pub use journal_backup::utils::cloud::mock::MockCloudProvider;
pub use journal_backup::utils::exporter::mock::FailingExporter;
pub use journal_backup::utils::settings::mock::MockSettingsStore;

use std::path::Path;
use std::sync::Arc;

/// Common test result type
pub type TestResult<T = ()> = anyhow::Result<T>;

/// Handles on the mocked collaborators of a task built by [`mocked_task`]
pub struct MockedCollaborators {
    pub repository: MockEntryRepository,
    pub cloud: MockCloudProvider,
    pub crash: MockCrashReporter,
    pub settings: MockSettingsStore,
    pub tray: NotificationTray,
}

impl MockedCollaborators {
    pub fn new(entries: Vec<JournalEntry>) -> Self {
        Self {
            repository: MockEntryRepository::with_entries(entries),
            cloud: MockCloudProvider::new(),
            crash: MockCrashReporter::new(),
            settings: MockSettingsStore::with_token("sl.test-token"),
            tray: NotificationTray::new(),
        }
    }
}

/// Build a task over mocked collaborators, exporting into `cache_dir`
pub fn mocked_task(mocks: &MockedCollaborators, cache_dir: &Path) -> BackupTask {
    let deps = BackupDeps {
        repository: Arc::new(mocks.repository.clone()),
        cloud_provider: Arc::new(mocks.cloud.clone()),
        crash_reporter: Arc::new(mocks.crash.clone()),
        settings: Arc::new(mocks.settings.clone()),
        notifications: NotificationDispatcher::new(
            NotificationConfig::default(),
            Arc::new(mocks.tray.clone()),
        ),
    };
    BackupTask::new(deps, cache_dir)
}
