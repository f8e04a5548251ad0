use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub dropbox: DropboxConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub crash_reporting: CrashReportingConfig,
}

/// Global configuration settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GlobalConfig {
    /// Directory the temporary CSV export is created in
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Lock file guarding against overlapping runs
    #[serde(default = "default_lock_file")]
    pub lock_file: PathBuf,

    /// Logging configuration
    #[serde(default = "default_log_directory")]
    pub log_directory: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_max_files")]
    pub log_max_files: u32,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            lock_file: default_lock_file(),
            log_directory: default_log_directory(),
            log_level: default_log_level(),
            log_max_files: default_log_max_files(),
        }
    }
}

/// Where journal entries are read from
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepositoryConfig {
    /// JSON file holding the journal entries
    pub entries_file: PathBuf,
}

/// Dropbox upload settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DropboxConfig {
    #[serde(default = "default_content_api_url")]
    pub content_api_url: String,

    /// Path of the backup file inside the Dropbox app folder
    #[serde(default = "default_remote_path")]
    pub remote_path: String,

    #[serde(default = "default_upload_timeout")]
    pub timeout_seconds: u64,
}

impl Default for DropboxConfig {
    fn default() -> Self {
        Self {
            content_api_url: default_content_api_url(),
            remote_path: default_remote_path(),
            timeout_seconds: default_upload_timeout(),
        }
    }
}

/// Persisted authorization state
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SettingsConfig {
    #[serde(default = "default_settings_file")]
    pub settings_file: PathBuf,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            settings_file: default_settings_file(),
        }
    }
}

/// Notification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
    /// Webhook receiving backup-failure notifications. Empty means log only.
    #[serde(default)]
    pub webhook_url: String,

    #[serde(default = "default_channel_id")]
    pub channel_id: String,

    /// Shared slot for every backup-failure notification
    #[serde(default = "default_notification_id")]
    pub notification_id: u32,

    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Remembers which webhook message occupies each notification slot
    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,

    #[serde(default = "default_account_url")]
    pub account_url: String,

    #[serde(default = "default_help_url")]
    pub help_url: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            channel_id: default_channel_id(),
            notification_id: default_notification_id(),
            app_name: default_app_name(),
            cache_file: default_cache_file(),
            account_url: default_account_url(),
            help_url: default_help_url(),
        }
    }
}

/// Crash reporting sink configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrashReportingConfig {
    #[serde(default = "default_crash_log_file")]
    pub crash_log_file: PathBuf,
}

impl Default for CrashReportingConfig {
    fn default() -> Self {
        Self {
            crash_log_file: default_crash_log_file(),
        }
    }
}

// Default value functions

fn default_cache_dir() -> PathBuf { PathBuf::from("~/.cache/journal-backup") }
fn default_lock_file() -> PathBuf { std::env::temp_dir().join("journal-backup.lock") }
fn default_log_directory() -> PathBuf { PathBuf::from("~/.local/state/journal-backup/logs") }
fn default_log_level() -> String { "info".to_string() }
fn default_log_max_files() -> u32 { 10 }
fn default_content_api_url() -> String { "https://content.dropboxapi.com".to_string() }
fn default_remote_path() -> String { "/journal_backup.csv".to_string() }
fn default_upload_timeout() -> u64 { 120 }
fn default_settings_file() -> PathBuf { PathBuf::from("~/.config/journal-backup/settings.json") }
fn default_channel_id() -> String { "backup_status".to_string() }
fn default_notification_id() -> u32 { 98104 }
fn default_app_name() -> String { "Journal".to_string() }
fn default_cache_file() -> PathBuf {
    PathBuf::from("~/.cache/journal-backup/notifications.json")
}
fn default_account_url() -> String { "https://www.dropbox.com/account/plan".to_string() }
fn default_help_url() -> String {
    "https://help.dropbox.com/accounts-billing/space-storage/over-storage-limit".to_string()
}
fn default_crash_log_file() -> PathBuf {
    PathBuf::from("~/.local/state/journal-backup/crashes.jsonl")
}
