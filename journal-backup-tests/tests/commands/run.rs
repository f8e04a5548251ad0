//! Tests for the 'run' command
//!
//! A full backup cycle against a mock Dropbox content API.

use journal_backup::utils::settings::{FileSettingsStore, SettingsStore};
use mockito::{Matcher, Mock, ServerGuard};
use std::sync::Arc;
use test_utils::{
    leftover_exports, read_json_lines, sample_entries, sample_entries_csv, BackupTask, Config,
    ConfigBuilder, NotificationKind, NotificationTray, TaskOutcome, INSUFFICIENT_SPACE_BODY,
    INVALID_TOKEN_BODY, RATE_LIMITED_BODY,
};

const TOKEN: &str = "sl.test-token";

async fn dropbox_responding(
    server: &mut ServerGuard,
    status: usize,
    body: &str,
    hits: usize,
) -> Mock {
    server
        .mock("POST", "/2/files/upload")
        .with_status(status)
        .with_body(body)
        .expect(hits)
        .create_async()
        .await
}

fn task(config: &Config, tray: &NotificationTray) -> BackupTask {
    BackupTask::from_config_with_sink(config, Arc::new(tray.clone())).unwrap()
}

async fn stored_token(config: &Config) -> Option<String> {
    FileSettingsStore::new(&config.settings.settings_file)
        .access_token()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_run_uploads_csv() {
    let mut server = mockito::Server::new_async().await;
    let upload = server
        .mock("POST", "/2/files/upload")
        .match_header("authorization", format!("Bearer {}", TOKEN).as_str())
        .match_header(
            "dropbox-api-arg",
            Matcher::Regex(r#""path":"/journal_backup.csv""#.to_string()),
        )
        .match_body(sample_entries_csv().as_str())
        .with_status(200)
        .with_body(r#"{"name": "journal_backup.csv"}"#)
        .expect(1)
        .create_async()
        .await;

    let (config, _temp_dir) = ConfigBuilder::new()
        .with_entries(&sample_entries())
        .with_access_token(TOKEN)
        .with_dropbox_url(&server.url())
        .persist();
    let tray = NotificationTray::new();

    let outcome = task(&config, &tray).run().await;

    assert_eq!(outcome, TaskOutcome::Success);
    upload.assert_async().await;
    assert!(leftover_exports(&config.global.cache_dir).is_empty());
    assert!(tray.delivered().is_empty());
    assert!(read_json_lines(&config.crash_reporting.crash_log_file).is_empty());
    assert_eq!(stored_token(&config).await, Some(TOKEN.to_string()));
}

#[tokio::test]
async fn test_run_without_entries_skips_upload() {
    let mut server = mockito::Server::new_async().await;
    let upload = dropbox_responding(&mut server, 200, "{}", 0).await;

    let (config, _temp_dir) = ConfigBuilder::new()
        .with_entries(&[])
        .with_access_token(TOKEN)
        .with_dropbox_url(&server.url())
        .persist();
    let tray = NotificationTray::new();

    assert_eq!(task(&config, &tray).run().await, TaskOutcome::Success);
    upload.assert_async().await;
    assert!(!config.global.cache_dir.exists() || leftover_exports(&config.global.cache_dir).is_empty());
}

#[tokio::test]
async fn test_run_without_entries_file() {
    let (config, _temp_dir) = ConfigBuilder::new().with_access_token(TOKEN).persist();
    let tray = NotificationTray::new();

    assert_eq!(task(&config, &tray).run().await, TaskOutcome::Success);
}

#[tokio::test]
async fn test_run_with_corrupt_entries_fails_without_upload() {
    let mut server = mockito::Server::new_async().await;
    let upload = dropbox_responding(&mut server, 200, "{}", 0).await;

    let (config, _temp_dir) = ConfigBuilder::new()
        .with_entries_content("{ not json")
        .with_access_token(TOKEN)
        .with_dropbox_url(&server.url())
        .persist();
    let tray = NotificationTray::new();

    assert_eq!(task(&config, &tray).run().await, TaskOutcome::Failure);
    upload.assert_async().await;
    assert!(tray.delivered().is_empty());
    assert!(read_json_lines(&config.crash_reporting.crash_log_file).is_empty());
}

#[tokio::test]
async fn test_run_revoked_token() {
    let mut server = mockito::Server::new_async().await;
    let _dropbox = dropbox_responding(&mut server, 401, INVALID_TOKEN_BODY, 1).await;

    let (config, _temp_dir) = ConfigBuilder::new()
        .with_entries(&sample_entries())
        .with_access_token(TOKEN)
        .with_dropbox_url(&server.url())
        .persist();
    let tray = NotificationTray::new();

    assert_eq!(task(&config, &tray).run().await, TaskOutcome::Failure);

    let visible = tray.visible();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].kind, NotificationKind::ReauthorizationNeeded);
    assert_eq!(stored_token(&config).await, None);

    let crashes = read_json_lines(&config.crash_reporting.crash_log_file);
    assert_eq!(crashes.len(), 1);
    assert_eq!(crashes[0]["kind"], "auth");
    assert_eq!(crashes[0]["fatal"], false);

    assert!(leftover_exports(&config.global.cache_dir).is_empty());
}

#[tokio::test]
async fn test_run_without_token_asks_to_reconnect() {
    let mut server = mockito::Server::new_async().await;
    let upload = dropbox_responding(&mut server, 200, "{}", 0).await;

    let (config, _temp_dir) = ConfigBuilder::new()
        .with_entries(&sample_entries())
        .with_dropbox_url(&server.url())
        .persist();
    let tray = NotificationTray::new();

    assert_eq!(task(&config, &tray).run().await, TaskOutcome::Failure);
    upload.assert_async().await;
    assert_eq!(tray.delivered_count(NotificationKind::ReauthorizationNeeded), 1);
}

#[tokio::test]
async fn test_run_dropbox_full() {
    let mut server = mockito::Server::new_async().await;
    let _dropbox = dropbox_responding(&mut server, 409, INSUFFICIENT_SPACE_BODY, 1).await;

    let (config, _temp_dir) = ConfigBuilder::new()
        .with_entries(&sample_entries())
        .with_access_token(TOKEN)
        .with_dropbox_url(&server.url())
        .persist();
    let tray = NotificationTray::new();

    assert_eq!(task(&config, &tray).run().await, TaskOutcome::Failure);

    assert_eq!(tray.delivered_count(NotificationKind::StorageFull), 1);
    assert_eq!(tray.delivered_count(NotificationKind::ReauthorizationNeeded), 0);
    // Storage problems keep the authorization
    assert_eq!(stored_token(&config).await, Some(TOKEN.to_string()));

    let crashes = read_json_lines(&config.crash_reporting.crash_log_file);
    assert_eq!(crashes.len(), 1);
    assert_eq!(crashes[0]["kind"], "insufficient_space");
}

#[tokio::test]
async fn test_run_auth_and_full_sends_both() {
    let mut server = mockito::Server::new_async().await;
    let _dropbox = dropbox_responding(&mut server, 401, "insufficient_space", 1).await;

    let (config, _temp_dir) = ConfigBuilder::new()
        .with_entries(&sample_entries())
        .with_access_token(TOKEN)
        .with_dropbox_url(&server.url())
        .persist();
    let tray = NotificationTray::new();

    assert_eq!(task(&config, &tray).run().await, TaskOutcome::Failure);

    let delivered: Vec<_> = tray.delivered().into_iter().map(|n| n.kind).collect();
    assert_eq!(
        delivered,
        vec![NotificationKind::ReauthorizationNeeded, NotificationKind::StorageFull]
    );
    // Same slot, so only the last one stays visible
    assert_eq!(tray.visible().len(), 1);
    assert_eq!(tray.visible()[0].kind, NotificationKind::StorageFull);
    assert_eq!(stored_token(&config).await, None);

    let crashes = read_json_lines(&config.crash_reporting.crash_log_file);
    assert_eq!(crashes.len(), 1);
    assert_eq!(crashes[0]["kind"], "auth+insufficient_space");
}

#[tokio::test]
async fn test_run_other_failure_is_only_logged() {
    let mut server = mockito::Server::new_async().await;
    let _dropbox = dropbox_responding(&mut server, 429, RATE_LIMITED_BODY, 1).await;

    let (config, _temp_dir) = ConfigBuilder::new()
        .with_entries(&sample_entries())
        .with_access_token(TOKEN)
        .with_dropbox_url(&server.url())
        .persist();
    let tray = NotificationTray::new();

    assert_eq!(task(&config, &tray).run().await, TaskOutcome::Failure);

    assert!(tray.delivered().is_empty());
    assert_eq!(stored_token(&config).await, Some(TOKEN.to_string()));
    let crashes = read_json_lines(&config.crash_reporting.crash_log_file);
    assert_eq!(crashes.len(), 1);
    assert_eq!(crashes[0]["kind"], "other");
    assert!(leftover_exports(&config.global.cache_dir).is_empty());
}

#[tokio::test]
async fn test_unreachable_dropbox_is_other_failure() {
    let (config, _temp_dir) = ConfigBuilder::new()
        .with_entries(&sample_entries())
        .with_access_token(TOKEN)
        .persist();
    let tray = NotificationTray::new();

    assert_eq!(task(&config, &tray).run().await, TaskOutcome::Failure);
    assert!(tray.delivered().is_empty());
    assert_eq!(read_json_lines(&config.crash_reporting.crash_log_file).len(), 1);
    assert!(leftover_exports(&config.global.cache_dir).is_empty());
}

#[tokio::test]
async fn test_repeated_failures_share_one_notification() {
    let mut server = mockito::Server::new_async().await;
    let _dropbox = dropbox_responding(&mut server, 409, INSUFFICIENT_SPACE_BODY, 2).await;

    let (config, _temp_dir) = ConfigBuilder::new()
        .with_entries(&sample_entries())
        .with_access_token(TOKEN)
        .with_dropbox_url(&server.url())
        .persist();
    let tray = NotificationTray::new();

    for _ in 0..2 {
        assert_eq!(task(&config, &tray).run().await, TaskOutcome::Failure);
    }

    assert_eq!(tray.delivered_count(NotificationKind::StorageFull), 2);
    assert_eq!(tray.visible().len(), 1);
    assert_eq!(read_json_lines(&config.crash_reporting.crash_log_file).len(), 2);
}
