//! Persisted cloud-provider authorization state

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Store holding the authorization for the configured cloud provider
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Current access token, if the provider is authorized
    async fn access_token(&self) -> Result<Option<String>>;

    /// Store a new access token
    async fn set_access_token(&self, token: &str) -> Result<()>;

    /// Forget the stored authorization so no further upload reuses it
    async fn revoke_authorization(&self) -> Result<()>;
}

/// On-disk settings document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub cloud_provider: Option<String>,
    #[serde(default)]
    pub dropbox_access_token: Option<String>,
    #[serde(default)]
    pub authorized_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Settings {
    /// Settings authorized with `token` as of now
    pub fn authorized(token: &str) -> Self {
        Self {
            cloud_provider: Some("dropbox".to_string()),
            dropbox_access_token: Some(token.to_string()),
            authorized_at: Some(Utc::now()),
            revoked_at: None,
        }
    }
}

/// Settings store backed by a JSON file
pub struct FileSettingsStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within the process
    write_lock: Mutex<()>,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the settings document, empty if the file does not exist
    pub async fn load(&self) -> Result<Settings> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read settings file: {:?}", self.path))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {:?}", self.path))
    }

    async fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(settings)
            .context("Failed to serialize settings")?;

        fs::write(&self.path, content)
            .await
            .with_context(|| format!("Failed to write settings file: {:?}", self.path))
    }

    async fn update(&self, f: impl FnOnce(&mut Settings) + Send) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut settings = self.load().await?;
        f(&mut settings);
        self.save(&settings).await
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn access_token(&self) -> Result<Option<String>> {
        Ok(self.load().await?.dropbox_access_token)
    }

    async fn set_access_token(&self, token: &str) -> Result<()> {
        let authorized = Settings::authorized(token);
        self.update(move |settings| *settings = authorized).await?;
        info!("Stored Dropbox authorization in {:?}", self.path);
        Ok(())
    }

    async fn revoke_authorization(&self) -> Result<()> {
        self.update(|settings| {
            settings.cloud_provider = None;
            settings.dropbox_access_token = None;
            settings.authorized_at = None;
            settings.revoked_at = Some(Utc::now());
        })
        .await?;
        debug!("Cleared Dropbox authorization in {:?}", self.path);
        Ok(())
    }
}

/// Mock implementation for testing
/// Available for use in external test crates
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct MockSettingsStore {
        token: Arc<Mutex<Option<String>>>,
        /// Number of revoke_authorization calls
        pub revocations: Arc<Mutex<usize>>,
        fail_revoke: bool,
    }

    impl MockSettingsStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_token(token: &str) -> Self {
            let store = Self::default();
            *store.token.lock().unwrap() = Some(token.to_string());
            store
        }

        /// Make revoke_authorization return an error (still counted)
        pub fn failing_revoke(mut self) -> Self {
            self.fail_revoke = true;
            self
        }

        pub fn revocation_count(&self) -> usize {
            *self.revocations.lock().unwrap()
        }

        pub fn current_token(&self) -> Option<String> {
            self.token.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SettingsStore for MockSettingsStore {
        async fn access_token(&self) -> Result<Option<String>> {
            Ok(self.current_token())
        }

        async fn set_access_token(&self, token: &str) -> Result<()> {
            *self.token.lock().unwrap() = Some(token.to_string());
            Ok(())
        }

        async fn revoke_authorization(&self) -> Result<()> {
            *self.revocations.lock().unwrap() += 1;
            if self.fail_revoke {
                anyhow::bail!("settings store unavailable");
            }
            *self.token.lock().unwrap() = None;
            Ok(())
        }
    }
}
