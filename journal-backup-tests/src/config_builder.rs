//! Fluent API for building test configurations
//!
//! Every path points inside a temporary directory owned by the builder, so a
//! persisted configuration can be run end to end without touching the home
//! directory.

use crate::fixtures::entries_json;
use journal_backup::config::{
    Config, CrashReportingConfig, DropboxConfig, GlobalConfig, NotificationConfig,
    RepositoryConfig, SettingsConfig,
};
use journal_backup::utils::settings::Settings;
use journal_backup::JournalEntry;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Address nothing listens on; uploads against it fail fast
const UNREACHABLE_URL: &str = "http://127.0.0.1:9";

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    config: Config,
    access_token: Option<String>,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder with every path inside a fresh temp dir
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path();

        let log_directory = root.join("logs");
        fs::create_dir_all(&log_directory).expect("Failed to create log_directory");

        let config = Config {
            global: GlobalConfig {
                cache_dir: root.join("cache"),
                lock_file: root.join("run.lock"),
                log_directory,
                log_level: "debug".to_string(),
                log_max_files: 5,
            },
            repository: RepositoryConfig {
                entries_file: root.join("entries.json"),
            },
            dropbox: DropboxConfig {
                content_api_url: UNREACHABLE_URL.to_string(),
                remote_path: "/journal_backup.csv".to_string(),
                timeout_seconds: 5,
            },
            settings: SettingsConfig {
                settings_file: root.join("settings.json"),
            },
            notifications: NotificationConfig {
                cache_file: root.join("notifications.json"),
                ..NotificationConfig::default()
            },
            crash_reporting: CrashReportingConfig {
                crash_log_file: root.join("crashes.jsonl"),
            },
        };

        Self {
            temp_dir,
            config,
            access_token: None,
        }
    }

    /// Write `entries` into the entries file
    pub fn with_entries(self, entries: &[JournalEntry]) -> Self {
        fs::write(&self.config.repository.entries_file, entries_json(entries))
            .expect("Failed to write entries file");
        self
    }

    /// Write raw content into the entries file
    pub fn with_entries_content(self, content: &str) -> Self {
        fs::write(&self.config.repository.entries_file, content)
            .expect("Failed to write entries file");
        self
    }

    /// Store a Dropbox access token in the settings file when persisted
    pub fn with_access_token(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    /// Point uploads at `url` (usually a mock server)
    pub fn with_dropbox_url(mut self, url: &str) -> Self {
        self.config.dropbox.content_api_url = url.to_string();
        self
    }

    pub fn with_remote_path(mut self, path: &str) -> Self {
        self.config.dropbox.remote_path = path.to_string();
        self
    }

    /// Deliver notifications to a webhook instead of the log
    pub fn with_webhook_url(mut self, url: &str) -> Self {
        self.config.notifications.webhook_url = url.to_string();
        self
    }

    pub fn with_log_level(mut self, level: &str) -> Self {
        self.config.global.log_level = level.to_string();
        self
    }

    pub fn with_cache_dir(mut self, path: &Path) -> Self {
        self.config.global.cache_dir = path.to_path_buf();
        self
    }

    /// Get a reference to the temp directory
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Build the configuration, discarding the temp directory
    pub fn build(self) -> Config {
        self.persist().0
    }

    /// Build the configuration and keep the temp directory alive
    pub fn persist(self) -> (Config, TempDir) {
        if let Some(token) = &self.access_token {
            let settings = serde_json::to_string_pretty(&Settings::authorized(token))
                .expect("Failed to serialize settings");
            fs::write(&self.config.settings.settings_file, settings)
                .expect("Failed to store access token");
        }
        (self.config, self.temp_dir)
    }

    /// Persist and also write the configuration as `config.toml`
    pub fn write_config(self) -> (Config, PathBuf, TempDir) {
        let (config, temp_dir) = self.persist();
        let path = temp_dir.path().join("config.toml");
        let toml_str = toml::to_string_pretty(&config).expect("Failed to serialize config");
        fs::write(&path, toml_str).expect("Failed to write config file");
        (config, path, temp_dir)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
