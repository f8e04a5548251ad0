use super::expand_tilde;
use super::types::*;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Load, validate and expand configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse configuration from TOML text
pub fn parse_config(contents: &str) -> Result<Config> {
    let mut config: Config = toml::from_str(contents)?;
    validate_config(&config)?;
    expand_paths(&mut config);
    Ok(config)
}

/// Validate the configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.repository.entries_file.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "repository.entries_file must not be empty".to_string(),
        ));
    }

    if config.global.log_max_files == 0 {
        return Err(ConfigError::ValidationError(
            "global.log_max_files must be at least 1".to_string(),
        ));
    }

    if !is_http_url(&config.dropbox.content_api_url) {
        return Err(ConfigError::ValidationError(format!(
            "dropbox.content_api_url is not an http(s) URL: {}",
            config.dropbox.content_api_url
        )));
    }

    if !config.dropbox.remote_path.starts_with('/') {
        return Err(ConfigError::ValidationError(format!(
            "dropbox.remote_path must start with '/': {}",
            config.dropbox.remote_path
        )));
    }

    if config.dropbox.timeout_seconds == 0 {
        return Err(ConfigError::ValidationError(
            "dropbox.timeout_seconds must be greater than zero".to_string(),
        ));
    }

    let notifications = &config.notifications;
    if !notifications.webhook_url.is_empty() && !is_http_url(&notifications.webhook_url) {
        return Err(ConfigError::ValidationError(format!(
            "notifications.webhook_url is not an http(s) URL: {}",
            notifications.webhook_url
        )));
    }

    if notifications.channel_id.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "notifications.channel_id must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

/// Replace a leading `~` in every configured path
fn expand_paths(config: &mut Config) {
    let global = &mut config.global;
    global.cache_dir = expand_tilde(&global.cache_dir);
    global.lock_file = expand_tilde(&global.lock_file);
    global.log_directory = expand_tilde(&global.log_directory);

    config.repository.entries_file = expand_tilde(&config.repository.entries_file);
    config.settings.settings_file = expand_tilde(&config.settings.settings_file);
    config.notifications.cache_file = expand_tilde(&config.notifications.cache_file);
    config.crash_reporting.crash_log_file = expand_tilde(&config.crash_reporting.crash_log_file);
}
