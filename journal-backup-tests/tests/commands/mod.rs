//! Command tests for journal-backup
//!
//! Run the operations behind each CLI command with real file-backed
//! collaborators, a local stand-in for the Dropbox API and an in-process
//! notification tray.

mod export;
mod run;
mod task;
