//! Backup task behavior with mocked collaborators

use std::sync::Arc;
use std::time::Duration;
use test_utils::{
    leftover_exports, mocked_task, sample_entries, sample_entries_csv, FailingExporter,
    MockCloudProvider, MockEntryRepository, MockSettingsStore, MockedCollaborators,
    NotificationKind, TaskOutcome, TestContext, UploadError,
};

#[tokio::test]
async fn test_upload_sees_complete_export() {
    let ctx = TestContext::new();
    let cache_dir = ctx.create_subdir("cache");
    let mocks = MockedCollaborators::new(sample_entries());

    let outcome = mocked_task(&mocks, &cache_dir).run().await;
    assert!(outcome.is_success());

    let calls = mocks.cloud.get_calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].file_existed);
    assert_eq!(calls[0].content.as_deref(), Some(sample_entries_csv().as_str()));
    assert!(calls[0].file.starts_with(&cache_dir));

    // Gone once the task returns
    assert!(!calls[0].file.exists());
    assert!(leftover_exports(&cache_dir).is_empty());
}

#[tokio::test]
async fn test_each_run_uses_a_fresh_file() {
    let ctx = TestContext::new();
    let cache_dir = ctx.create_subdir("cache");
    let mocks = MockedCollaborators::new(sample_entries());
    let task = mocked_task(&mocks, &cache_dir);

    task.run().await;
    task.run().await;

    let calls = mocks.cloud.get_calls();
    assert_eq!(calls.len(), 2);
    assert_ne!(calls[0].file, calls[1].file);
}

#[tokio::test]
async fn test_empty_repository_never_uploads() {
    let ctx = TestContext::new();
    let mocks = MockedCollaborators::new(vec![]);

    let outcome = mocked_task(&mocks, ctx.temp_dir()).run().await;

    assert_eq!(outcome, TaskOutcome::Success);
    assert_eq!(mocks.repository.read_count(), 1);
    assert_eq!(mocks.cloud.upload_count(), 0);
    assert_eq!(mocks.crash.report_count(), 0);
}

#[tokio::test]
async fn test_repository_error_fails_quietly() {
    let ctx = TestContext::new();
    let mut mocks = MockedCollaborators::new(vec![]);
    mocks.repository = MockEntryRepository::new().failing("database locked");

    let outcome = mocked_task(&mocks, ctx.temp_dir()).run().await;

    assert_eq!(outcome, TaskOutcome::Failure);
    assert_eq!(mocks.cloud.upload_count(), 0);
    assert_eq!(mocks.crash.report_count(), 0);
    assert!(mocks.tray.delivered().is_empty());
}

#[tokio::test]
async fn test_unwritable_cache_dir_fails_before_upload() {
    let ctx = TestContext::new();
    // A file where the cache directory should be
    let blocked = ctx.create_file("cache", "not a directory");
    let mocks = MockedCollaborators::new(sample_entries());

    let outcome = mocked_task(&mocks, &blocked).run().await;

    assert_eq!(outcome, TaskOutcome::Failure);
    assert_eq!(mocks.cloud.upload_count(), 0);
    assert_eq!(mocks.crash.report_count(), 0);
}

#[tokio::test]
async fn test_export_failure_is_silent() {
    let ctx = TestContext::new();
    let cache_dir = ctx.create_subdir("cache");
    let mocks = MockedCollaborators::new(sample_entries());
    let exporter = FailingExporter::new();

    let outcome = mocked_task(&mocks, &cache_dir)
        .with_exporter(Arc::new(exporter.clone()))
        .run()
        .await;

    assert_eq!(outcome, TaskOutcome::Failure);
    assert_eq!(exporter.export_count(), 1);
    assert_eq!(mocks.cloud.upload_count(), 0);
    assert_eq!(mocks.crash.report_count(), 0);
    assert_eq!(mocks.settings.revocation_count(), 0);
    assert!(mocks.tray.delivered().is_empty());
    assert!(leftover_exports(&cache_dir).is_empty());
}

#[tokio::test]
async fn test_auth_failure_revokes_and_notifies() {
    let ctx = TestContext::new();
    let mut mocks = MockedCollaborators::new(sample_entries());
    mocks.cloud = MockCloudProvider::new().failing(UploadError::auth("expired"));

    let outcome = mocked_task(&mocks, ctx.temp_dir()).run().await;

    assert_eq!(outcome, TaskOutcome::Failure);
    assert_eq!(mocks.settings.revocation_count(), 1);
    assert_eq!(mocks.settings.current_token(), None);
    assert_eq!(mocks.tray.delivered_count(NotificationKind::ReauthorizationNeeded), 1);
    assert_eq!(mocks.crash.report_count(), 1);
    assert!(leftover_exports(ctx.temp_dir()).is_empty());
}

#[tokio::test]
async fn test_failed_revocation_still_fails_task() {
    let ctx = TestContext::new();
    let mut mocks = MockedCollaborators::new(sample_entries());
    mocks.cloud = MockCloudProvider::new().failing(UploadError::auth("expired"));
    mocks.settings = MockSettingsStore::with_token("sl.test-token").failing_revoke();

    let outcome = mocked_task(&mocks, ctx.temp_dir()).run().await;

    assert_eq!(outcome, TaskOutcome::Failure);
    assert_eq!(mocks.settings.revocation_count(), 1);
    assert_eq!(mocks.tray.delivered_count(NotificationKind::ReauthorizationNeeded), 1);
    assert_eq!(mocks.crash.report_count(), 1);
}

#[tokio::test]
async fn test_crash_report_carries_original_error() {
    let ctx = TestContext::new();
    let mut mocks = MockedCollaborators::new(sample_entries());
    mocks.cloud =
        MockCloudProvider::new().failing(UploadError::insufficient_space("quota exceeded"));

    mocked_task(&mocks, ctx.temp_dir()).run().await;

    let reports = mocks.crash.get_reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].message(), "quota exceeded");
    assert!(reports[0].is_insufficient_space());
    assert_eq!(mocks.settings.revocation_count(), 0);
}

#[tokio::test]
async fn test_cancelled_run_removes_export() {
    let ctx = TestContext::new();
    let cache_dir = ctx.create_subdir("cache");
    let mut mocks = MockedCollaborators::new(sample_entries());
    mocks.cloud = MockCloudProvider::new().with_delay(Duration::from_secs(30));

    let task = mocked_task(&mocks, &cache_dir);
    let result = tokio::time::timeout(Duration::from_millis(200), task.run()).await;

    assert!(result.is_err(), "Run should have been cancelled");
    assert_eq!(mocks.cloud.upload_count(), 1);
    assert!(leftover_exports(&cache_dir).is_empty());
    assert_eq!(mocks.crash.report_count(), 0);
}
