//! Configuration module for journal-backup
//!
//! This module handles loading, validating, and expanding configuration from TOML files.
//!
//! Only the `[repository]` section is required; every other section falls back to
//! defaults suitable for a single-user desktop install.
//!
//! ## Example Usage
//!
//! ```no_run
//! use journal_backup::config;
//!
//! let config = config::load_config("config.toml")?;
//! println!("Entries: {:?}", config.repository.entries_file);
//! # Ok::<(), config::ConfigError>(())
//! ```

mod loader;
mod types;

pub use loader::{load_config, parse_config, ConfigError, Result};
pub use types::*;

/// Expand tilde (~) in path
pub fn expand_tilde(path: &std::path::Path) -> std::path::PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

/// Default location of the configuration file
pub fn default_config_path() -> std::path::PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("journal-backup")
        .join("config.toml")
}
