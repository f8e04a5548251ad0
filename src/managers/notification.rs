//! Backup failure notifications
//!
//! The dispatcher builds the two user-facing failure notifications and hands them
//! to a [`NotificationSink`]. Both share one channel and one notification id, so a
//! later notification replaces an earlier one that is still visible.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::config::NotificationConfig;

/// In-app screen opened by the re-authorization notification
pub const SETTINGS_SCREEN: &str = "Settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ReauthorizationNeeded,
    StorageFull,
}

/// Both backup notifications interrupt the user, so high is the only level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
}

/// What happens when the user taps a notification or one of its actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapAction {
    /// Deep link into an in-app screen
    OpenScreen(String),
    OpenUrl(String),
}

impl TapAction {
    fn describe(&self) -> String {
        match self {
            TapAction::OpenScreen(screen) => format!("Open {} in the app", screen),
            TapAction::OpenUrl(url) => url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryAction {
    pub label: String,
    pub action: TapAction,
}

/// Notification payload handed to a sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub channel_id: String,
    pub id: u32,
    pub title: String,
    pub body: String,
    pub priority: Priority,
    pub tap_action: TapAction,
    pub secondary_action: Option<SecondaryAction>,
    /// Dismissed automatically once tapped
    pub auto_cancel: bool,
}

impl Notification {
    /// Slot the notification occupies; same slot means replacement
    pub fn slot(&self) -> String {
        format!("{}:{}", self.channel_id, self.id)
    }
}

/// Platform capability that displays notifications
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Builds and dispatches the backup failure notifications
pub struct NotificationDispatcher {
    config: NotificationConfig,
    sink: Arc<dyn NotificationSink>,
}

impl NotificationDispatcher {
    pub fn new(config: NotificationConfig, sink: Arc<dyn NotificationSink>) -> Self {
        Self { config, sink }
    }

    fn title(&self) -> String {
        format!("{} Automatic Backup Failure", self.config.app_name)
    }

    /// Persistent notification asking the user to reconnect Dropbox
    pub fn auth_failure_notification(&self) -> Notification {
        Notification {
            kind: NotificationKind::ReauthorizationNeeded,
            channel_id: self.config.channel_id.clone(),
            id: self.config.notification_id,
            title: self.title(),
            body: "There was a problem with your Dropbox account, click here to reconnect \
                   to Dropbox to resume automatic backups."
                .to_string(),
            priority: Priority::High,
            tap_action: TapAction::OpenScreen(SETTINGS_SCREEN.to_string()),
            secondary_action: None,
            // Removed once the user re-authorizes
            auto_cancel: false,
        }
    }

    /// Notification pointing the user at their Dropbox plan
    pub fn storage_full_notification(&self) -> Notification {
        Notification {
            kind: NotificationKind::StorageFull,
            channel_id: self.config.channel_id.clone(),
            id: self.config.notification_id,
            title: self.title(),
            body: format!(
                "{} failed to backup your data because your Dropbox is full. \
                 Tap to view your Dropbox account.",
                self.config.app_name
            ),
            priority: Priority::High,
            tap_action: TapAction::OpenUrl(self.config.account_url.clone()),
            secondary_action: Some(SecondaryAction {
                label: "Learn more".to_string(),
                action: TapAction::OpenUrl(self.config.help_url.clone()),
            }),
            auto_cancel: true,
        }
    }

    pub async fn send_auth_failure(&self) -> Result<()> {
        self.dispatch(self.auth_failure_notification()).await
    }

    pub async fn send_storage_full(&self) -> Result<()> {
        self.dispatch(self.storage_full_notification()).await
    }

    async fn dispatch(&self, notification: Notification) -> Result<()> {
        self.sink
            .deliver(&notification)
            .await
            .with_context(|| format!("Failed to deliver {:?} notification", notification.kind))?;

        info!(
            "Sent {:?} notification in slot {}",
            notification.kind,
            notification.slot()
        );
        Ok(())
    }
}

/// In-process notification tray; one visible notification per slot
#[derive(Clone, Default)]
pub struct NotificationTray {
    visible: Arc<Mutex<HashMap<String, Notification>>>,
    delivered: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationTray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently visible notifications
    pub fn visible(&self) -> Vec<Notification> {
        let mut visible: Vec<_> = lock(&self.visible).values().cloned().collect();
        visible.sort_by_key(|n| n.slot());
        visible
    }

    /// Every notification ever delivered, in order
    pub fn delivered(&self) -> Vec<Notification> {
        lock(&self.delivered).clone()
    }

    pub fn delivered_count(&self, kind: NotificationKind) -> usize {
        lock(&self.delivered)
            .iter()
            .filter(|n| n.kind == kind)
            .count()
    }

    /// Remove the notification in a slot, as a user dismissal would
    pub fn dismiss(&self, channel_id: &str, id: u32) -> Option<Notification> {
        lock(&self.visible).remove(&format!("{}:{}", channel_id, id))
    }
}

#[async_trait]
impl NotificationSink for NotificationTray {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        let replaced = lock(&self.visible).insert(notification.slot(), notification.clone());

        if let Some(old) = replaced {
            debug!("{:?} notification replaced {:?}", notification.kind, old.kind);
        }

        lock(&self.delivered).push(notification.clone());
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Sink that only logs, used when no webhook is configured
#[derive(Debug, Clone, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        warn!(
            kind = ?notification.kind,
            slot = %notification.slot(),
            "{}: {}",
            notification.title,
            notification.body
        );
        Ok(())
    }
}

/// Embed color for high priority notifications (#E74C3C)
const HIGH_PRIORITY_COLOR: u32 = 15158332;

/// Webhook payload (Discord-compatible)
#[derive(Debug, Serialize)]
struct WebhookPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    embeds: Vec<WebhookEmbed>,
}

#[derive(Debug, Serialize)]
struct WebhookEmbed {
    title: String,
    description: String,
    color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<WebhookField>,
    footer: WebhookFooter,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
}

#[derive(Debug, Serialize)]
struct WebhookField {
    name: String,
    value: String,
    inline: bool,
}

#[derive(Debug, Serialize)]
struct WebhookFooter {
    text: String,
}

#[derive(Debug, Deserialize)]
struct WebhookMessage {
    id: String,
}

/// Slot to webhook message cache
#[derive(Debug, Serialize, Deserialize, Default)]
struct SlotCache {
    /// Map of notification slot to the message currently shown in it
    messages: HashMap<String, String>,
}

/// Delivers notifications to a webhook, editing the message already posted for
/// a slot instead of posting a second one
pub struct WebhookSink {
    webhook_url: String,
    app_name: String,
    cache_path: PathBuf,
    client: reqwest::Client,
}

impl WebhookSink {
    pub fn new(config: &NotificationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            webhook_url: config.webhook_url.clone(),
            app_name: config.app_name.clone(),
            cache_path: config.cache_file.clone(),
            client,
        })
    }

    /// Build webhook payload
    fn build_payload(&self, notification: &Notification) -> WebhookPayload {
        let color = match notification.priority {
            Priority::High => HIGH_PRIORITY_COLOR,
        };

        let url = match notification.tap_action {
            TapAction::OpenUrl(ref url) => Some(url.clone()),
            TapAction::OpenScreen(_) => None,
        };

        let mut fields = vec![WebhookField {
            name: "Tap".to_string(),
            value: notification.tap_action.describe(),
            inline: false,
        }];

        if let Some(ref secondary) = notification.secondary_action {
            fields.push(WebhookField {
                name: secondary.label.clone(),
                value: secondary.action.describe(),
                inline: false,
            });
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| {
                chrono::DateTime::from_timestamp(d.as_secs() as i64, 0)
                    .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
            })
            .ok()
            .flatten();

        WebhookPayload {
            username: Some(format!("{} Backup", self.app_name)),
            embeds: vec![WebhookEmbed {
                title: notification.title.clone(),
                description: notification.body.clone(),
                color,
                url,
                fields,
                footer: WebhookFooter {
                    text: notification.channel_id.clone(),
                },
                timestamp,
            }],
        }
    }

    fn message_url(&self, message_id: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.webhook_url).context("Invalid webhook URL")?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Webhook URL cannot be a base"))?
            .push("messages")
            .push(message_id);
        Ok(url)
    }

    /// Post a new message and return its id
    async fn post(&self, payload: &WebhookPayload) -> Result<String> {
        let response = self
            .client
            .post(&self.webhook_url)
            .query(&[("wait", "true")])
            .json(payload)
            .send()
            .await
            .context("Failed to send webhook")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Webhook failed with status {}: {}", status, body);
            anyhow::bail!("Webhook failed with status {}: {}", status, body);
        }

        let message: WebhookMessage = response
            .json()
            .await
            .context("Failed to parse webhook response")?;
        Ok(message.id)
    }

    /// Edit an existing message; false if it no longer exists
    async fn edit(&self, message_id: &str, payload: &WebhookPayload) -> Result<bool> {
        let response = self
            .client
            .patch(self.message_url(message_id)?)
            .json(payload)
            .send()
            .await
            .context("Failed to edit webhook message")?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(false);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Webhook edit failed with status {}: {}", status, body);
        }
        Ok(true)
    }

    async fn load_cache(&self) -> Result<SlotCache> {
        if !fs::try_exists(&self.cache_path).await.unwrap_or(false) {
            return Ok(SlotCache::default());
        }

        let content = fs::read_to_string(&self.cache_path)
            .await
            .context("Failed to read notification cache")?;

        serde_json::from_str(&content).context("Failed to parse notification cache")
    }

    async fn save_cache(&self, cache: &SlotCache) -> Result<()> {
        if let Some(parent) = self.cache_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(cache)
            .context("Failed to serialize notification cache")?;

        fs::write(&self.cache_path, content)
            .await
            .context("Failed to write notification cache")
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        let payload = self.build_payload(notification);
        let slot = notification.slot();
        let mut cache = self.load_cache().await?;

        if let Some(message_id) = cache.messages.get(&slot).cloned() {
            if self.edit(&message_id, &payload).await? {
                debug!("Replaced webhook message {} in slot {}", message_id, slot);
                return Ok(());
            }
            debug!("Webhook message {} was deleted, posting a new one", message_id);
        }

        let message_id = self.post(&payload).await?;
        cache.messages.insert(slot, message_id);
        self.save_cache(&cache).await
    }
}

/// Build the sink matching the configuration
pub fn sink_from_config(config: &NotificationConfig) -> Result<Arc<dyn NotificationSink>> {
    if config.webhook_url.is_empty() {
        Ok(Arc::new(LogSink))
    } else {
        Ok(Arc::new(WebhookSink::new(config)?))
    }
}
