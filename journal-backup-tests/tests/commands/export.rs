//! Tests for the 'export' command
//!
//! The export command writes the CSV to a chosen path without uploading it.

use journal_backup::utils::exporter::{ExportResult, FileExporter};
use journal_backup::{EntryRepository, JsonEntryRepository};
use test_utils::{sample_entries, sample_entries_csv, ConfigBuilder, TestContext};

#[tokio::test]
async fn test_export_from_entries_file() {
    let (config, temp_dir) = ConfigBuilder::new().with_entries(&sample_entries()).persist();
    let output = temp_dir.path().join("out.csv");

    let repository = JsonEntryRepository::new(&config.repository.entries_file);
    let entries = repository.get_entries().await.unwrap();
    assert_eq!(entries, sample_entries());

    let exporter = FileExporter::create(&output).unwrap();
    assert!(matches!(
        exporter.export_to_csv(&entries, &output),
        ExportResult::Created(_)
    ));
    assert_eq!(std::fs::read_to_string(&output).unwrap(), sample_entries_csv());
}

#[tokio::test]
async fn test_export_overwrites_existing_file() {
    let ctx = TestContext::new();
    let output = ctx.create_file("out.csv", "stale content that is longer than the export");

    let exporter = FileExporter::create(&output).unwrap();
    exporter.export_to_csv(&[], &output);

    assert_eq!(ctx.read_file("out.csv").unwrap(), "entryDate,entryContent\n");
}

#[tokio::test]
async fn test_entries_file_with_unknown_date_format() {
    let ctx = TestContext::new();
    let path = ctx.create_file(
        "entries.json",
        r#"[{"entryDate": "01/02/2024", "entryContent": "x"}]"#,
    );

    let result = JsonEntryRepository::new(&path).get_entries().await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_empty_entries_file_has_no_entries() {
    let ctx = TestContext::new();
    let path = ctx.create_file("entries.json", "  \n");

    let entries = JsonEntryRepository::new(&path).get_entries().await.unwrap();
    assert!(entries.is_empty());
}
