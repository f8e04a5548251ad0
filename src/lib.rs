//! Journal Backup Library
//!
//! Exports journal entries to CSV and uploads the file to Dropbox, notifying the
//! user when the upload needs their attention.

pub mod config;
pub mod journal;
pub mod managers;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, Config};
pub use journal::{EntryRepository, JournalEntry, JsonEntryRepository};
pub use managers::backup::{BackupDeps, BackupTask, TaskOutcome};
pub use managers::crash::{CrashReporter, FileCrashReporter};
pub use managers::logging::{init_console_logging, init_logging, LogGuard, LoggingConfig};
pub use managers::notification::{NotificationDispatcher, NotificationSink, NotificationTray};
pub use utils::cloud::{CloudProvider, UploadError, UploadResult};
pub use utils::settings::{FileSettingsStore, SettingsStore};
