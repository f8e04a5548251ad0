pub mod cloud;
pub mod dropbox;
pub mod exporter;
pub mod locker;
pub mod settings;
pub mod temp_file;

// Re-export commonly used types and traits (used by test crate)
#[allow(unused_imports)]
pub use cloud::{CloudProvider, FailureClass, UploadError, UploadResult};
#[allow(unused_imports)]
pub use exporter::{CsvExporter, EntryExporter, ExportResult, FileExporter};
#[allow(unused_imports)]
pub use settings::{FileSettingsStore, SettingsStore};
