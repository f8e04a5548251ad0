//! Dropbox uploader
//!
//! Uploads the export through the Dropbox content API and classifies failures
//! into the fault classes of [`UploadError`].

use crate::config::DropboxConfig;
use crate::utils::cloud::{CloudProvider, FailureClass, UploadError, UploadResult};
use crate::utils::settings::SettingsStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Argument of the `/2/files/upload` endpoint, sent in the `Dropbox-API-Arg` header
#[derive(Debug, Serialize)]
struct UploadArg<'a> {
    path: &'a str,
    mode: &'static str,
    autorename: bool,
    mute: bool,
}

/// Error body returned by the Dropbox API
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error_summary: String,
}

pub struct DropboxUploader {
    client: reqwest::Client,
    config: DropboxConfig,
    settings: Arc<dyn SettingsStore>,
}

impl DropboxUploader {
    pub fn new(config: DropboxConfig, settings: Arc<dyn SettingsStore>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            config,
            settings,
        })
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/2/files/upload",
            self.config.content_api_url.trim_end_matches('/')
        )
    }

    async fn try_upload(&self, file: &Path) -> std::result::Result<(), UploadError> {
        let token = match self.settings.access_token().await {
            Ok(Some(token)) => token,
            Ok(None) => return Err(UploadError::auth("No Dropbox access token stored")),
            Err(e) => {
                return Err(UploadError::other(format!(
                    "Failed to read Dropbox authorization: {:#}",
                    e
                )))
            }
        };

        let body = tokio::fs::read(file).await.map_err(|e| {
            UploadError::other(format!("Failed to read export {:?}: {}", file, e))
        })?;

        let arg = UploadArg {
            path: &self.config.remote_path,
            mode: "overwrite",
            autorename: false,
            mute: true,
        };
        let arg = header_safe_json(&arg)
            .map_err(|e| UploadError::other(format!("Failed to encode upload argument: {}", e)))?;

        debug!(
            "Uploading {} bytes to Dropbox path {}",
            body.len(),
            self.config.remote_path
        );

        let response = self
            .client
            .post(self.upload_url())
            .bearer_auth(token)
            .header("Dropbox-API-Arg", arg)
            .header("Content-Type", "application/octet-stream")
            .body(body)
            .send()
            .await
            .map_err(|e| UploadError::other(format!("Dropbox request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            info!("Uploaded backup to Dropbox: {}", self.config.remote_path);
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        warn!("Dropbox upload failed with status {}: {}", status, text);
        Err(classify_failure(status.as_u16(), &text))
    }
}

#[async_trait]
impl CloudProvider for DropboxUploader {
    async fn upload_to_cloud(&self, file: &Path) -> UploadResult {
        match self.try_upload(file).await {
            Ok(()) => UploadResult::Success,
            Err(e) => UploadResult::Failure(e),
        }
    }

    fn name(&self) -> &'static str {
        "dropbox"
    }
}

/// Classify a failed Dropbox response
pub fn classify_failure(status: u16, body: &str) -> UploadError {
    let summary = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error_summary)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| body.trim().to_string());

    let message = if summary.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, summary)
    };

    let mut error = UploadError::other(message);

    if status == 401
        || summary.starts_with("invalid_access_token")
        || summary.starts_with("expired_access_token")
    {
        error = error.with_class(FailureClass::Auth);
    }

    if summary.contains("insufficient_space") {
        error = error.with_class(FailureClass::InsufficientSpace);
    }

    error
}

/// Serialize to JSON with every non-ASCII character escaped, as HTTP headers require
fn header_safe_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let json = serde_json::to_string(value)?;
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    Ok(out)
}
