//! Unit tests for config loading and validation

use journal_backup::config::{parse_config, ConfigError};
use rstest::rstest;
use serial_test::serial;
use test_utils::{ConfigBuilder, ResultAssertions};

const MINIMAL: &str = r#"
[repository]
entries_file = "/var/lib/journal/entries.json"
"#;

#[test]
fn test_minimal_config_uses_defaults() {
    let config = parse_config(MINIMAL).assert_ok();

    assert_eq!(config.dropbox.content_api_url, "https://content.dropboxapi.com");
    assert_eq!(config.dropbox.remote_path, "/journal_backup.csv");
    assert_eq!(config.notifications.channel_id, "backup_status");
    assert_eq!(config.notifications.notification_id, 98104);
    assert!(config.notifications.webhook_url.is_empty());
    assert_eq!(config.global.log_level, "info");
}

#[test]
fn test_missing_repository_section() {
    let result = parse_config("[global]\nlog_level = \"debug\"\n");
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[rstest]
#[case::empty_entries_file("[repository]\nentries_file = \"\"\n", "entries_file")]
#[case::zero_log_files("[global]\nlog_max_files = 0\n[repository]\nentries_file = \"/e.json\"\n", "log_max_files")]
#[case::bad_content_url("[repository]\nentries_file = \"/e.json\"\n[dropbox]\ncontent_api_url = \"ftp://x\"\n", "content_api_url")]
#[case::relative_remote_path("[repository]\nentries_file = \"/e.json\"\n[dropbox]\nremote_path = \"backup.csv\"\n", "remote_path")]
#[case::zero_timeout("[repository]\nentries_file = \"/e.json\"\n[dropbox]\ntimeout_seconds = 0\n", "timeout_seconds")]
#[case::bad_webhook("[repository]\nentries_file = \"/e.json\"\n[notifications]\nwebhook_url = \"discord\"\n", "webhook_url")]
#[case::blank_channel("[repository]\nentries_file = \"/e.json\"\n[notifications]\nchannel_id = \" \"\n", "channel_id")]
fn test_validation_errors(#[case] toml: &str, #[case] field: &str) {
    match parse_config(toml) {
        Err(ConfigError::ValidationError(msg)) => {
            assert!(msg.contains(field), "'{}' should mention {}", msg, field)
        }
        other => panic!("Expected validation error for {}, got {:?}", field, other),
    }
}

#[test]
#[serial]
fn test_tilde_paths_are_expanded() {
    let config = parse_config("[repository]\nentries_file = \"~/journal/entries.json\"\n").assert_ok();
    assert!(!config.repository.entries_file.starts_with("~"));
    assert!(config.repository.entries_file.ends_with("journal/entries.json"));
    assert!(!config.global.cache_dir.starts_with("~"));
}

#[test]
#[serial]
fn test_default_paths_follow_home() {
    let previous = std::env::var_os("HOME");
    std::env::set_var("HOME", "/home/journal");

    let result = parse_config(MINIMAL);

    match previous {
        Some(home) => std::env::set_var("HOME", home),
        None => std::env::remove_var("HOME"),
    }

    let config = result.assert_ok();
    assert_eq!(
        config.global.cache_dir,
        std::path::PathBuf::from("/home/journal/.cache/journal-backup")
    );
    assert_eq!(
        config.settings.settings_file,
        std::path::PathBuf::from("/home/journal/.config/journal-backup/settings.json")
    );
}

#[test]
fn test_builder_config_round_trips_through_toml() {
    let (config, _temp_dir) = ConfigBuilder::new()
        .with_webhook_url("https://discord.com/api/webhooks/1/abc")
        .with_log_level("warn")
        .persist();

    let toml_str = toml::to_string_pretty(&config).unwrap();
    let parsed = parse_config(&toml_str).assert_ok();

    assert_eq!(parsed.notifications.webhook_url, config.notifications.webhook_url);
    assert_eq!(parsed.global.log_level, "warn");
    assert_eq!(parsed.global.cache_dir, config.global.cache_dir);
}
