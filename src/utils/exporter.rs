//! CSV export of journal entries
//!
//! Failures are reported through [`ExportResult`] instead of being raised, the
//! caller owns the destination file and deletes it whatever the outcome.

use crate::journal::JournalEntry;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Header row of every export
pub const CSV_HEADER: [&str; 2] = ["entryDate", "entryContent"];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV serialization failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error while exporting: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of an export
#[derive(Debug)]
pub enum ExportResult {
    /// Every entry was written and flushed to this file
    Created(PathBuf),
    Failed(ExportError),
}

/// Serializes entries as CSV into a writer
pub struct FileExporter<W: Write> {
    writer: csv::Writer<W>,
}

impl FileExporter<BufWriter<File>> {
    /// Create an exporter truncating and writing `path`
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> FileExporter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
        }
    }

    /// Write `entries` in order and report `file` as the created export
    pub fn export_to_csv(mut self, entries: &[JournalEntry], file: &Path) -> ExportResult {
        match self.write_entries(entries) {
            Ok(()) => {
                debug!("Exported {} entries to {:?}", entries.len(), file);
                ExportResult::Created(file.to_path_buf())
            }
            Err(e) => ExportResult::Failed(e),
        }
    }

    fn write_entries(&mut self, entries: &[JournalEntry]) -> Result<(), ExportError> {
        self.writer.write_record(CSV_HEADER)?;

        for entry in entries {
            let date = entry.entry_date.format("%Y-%m-%d").to_string();
            self.writer
                .write_record([date.as_str(), entry.entry_content.as_str()])?;
        }

        self.writer.flush()?;
        Ok(())
    }
}

/// Writes the export into a file the caller already opened
pub trait EntryExporter: Send + Sync {
    fn export(&self, entries: &[JournalEntry], file: File, path: &Path) -> ExportResult;
}

/// CSV exporter used by the backup task
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter;

impl EntryExporter for CsvExporter {
    fn export(&self, entries: &[JournalEntry], file: File, path: &Path) -> ExportResult {
        FileExporter::new(BufWriter::new(file)).export_to_csv(entries, path)
    }
}

/// Mock implementation for testing
/// Available for use in external test crates
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Writer rejecting every write, like a full disk
    pub struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
        }
    }

    /// Exporter whose output never reaches the file
    #[derive(Clone, Default)]
    pub struct FailingExporter {
        /// Number of export calls
        pub exports: Arc<Mutex<usize>>,
    }

    impl FailingExporter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn export_count(&self) -> usize {
            *self.exports.lock().unwrap()
        }
    }

    impl EntryExporter for FailingExporter {
        fn export(&self, entries: &[JournalEntry], _file: File, path: &Path) -> ExportResult {
            *self.exports.lock().unwrap() += 1;
            FileExporter::new(BrokenWriter).export_to_csv(entries, path)
        }
    }
}
