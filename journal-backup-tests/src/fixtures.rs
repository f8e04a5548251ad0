//! Shared test data

use chrono::NaiveDate;
use journal_backup::JournalEntry;

/// Response body of Dropbox for a revoked or unknown token
pub const INVALID_TOKEN_BODY: &str =
    r#"{"error_summary": "invalid_access_token/..", "error": {".tag": "invalid_access_token"}}"#;

/// Response body of Dropbox for an expired token
pub const EXPIRED_TOKEN_BODY: &str =
    r#"{"error_summary": "expired_access_token/...", "error": {".tag": "expired_access_token"}}"#;

/// Response body of Dropbox when the account is out of space
pub const INSUFFICIENT_SPACE_BODY: &str = r#"{"error_summary": "path/insufficient_space/...", "error": {".tag": "path", "reason": {".tag": "insufficient_space"}}}"#;

/// Response body of Dropbox when it throttles writes
pub const RATE_LIMITED_BODY: &str = r#"{"error_summary": "too_many_write_operations/..."}"#;

/// Build an entry for the given day
pub fn entry(year: i32, month: u32, day: u32, content: &str) -> JournalEntry {
    let date = NaiveDate::from_ymd_opt(year, month, day).expect("Invalid fixture date");
    JournalEntry::new(date, content)
}

/// A few plain entries in date order
pub fn sample_entries() -> Vec<JournalEntry> {
    vec![
        entry(2024, 1, 1, "New year, new journal"),
        entry(2024, 1, 2, "Went for a long walk"),
        entry(2024, 1, 3, "Rainy day, stayed in"),
    ]
}

/// Entries whose content needs CSV quoting
pub fn tricky_entries() -> Vec<JournalEntry> {
    vec![
        entry(2024, 2, 1, "Bought apples, pears and plums"),
        entry(2024, 2, 2, "She said \"hello\""),
        entry(2024, 2, 3, "First line\nSecond line"),
        entry(2024, 2, 4, "Café 🌧"),
    ]
}

/// CSV produced for [`sample_entries`]
pub fn sample_entries_csv() -> String {
    "entryDate,entryContent\n\
     2024-01-01,\"New year, new journal\"\n\
     2024-01-02,Went for a long walk\n\
     2024-01-03,\"Rainy day, stayed in\"\n"
        .to_string()
}

/// JSON document the entries repository reads
pub fn entries_json(entries: &[JournalEntry]) -> String {
    serde_json::to_string_pretty(entries).expect("Failed to serialize entries")
}
