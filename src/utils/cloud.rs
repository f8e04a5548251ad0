//! Cloud provider abstraction
//!
//! Providers classify their failures once, at the boundary, into the fault
//! classes the backup task reacts to. Classes are independent: one error may be
//! both an authorization failure and an out-of-space failure.

use async_trait::async_trait;
use std::path::Path;

/// Fault class of a failed upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The stored credential was rejected
    Auth,
    /// The remote account has no room left for the file
    InsufficientSpace,
}

/// A classified upload failure
#[derive(Debug, Clone, thiserror::Error)]
#[error("upload failed ({}): {message}", kind_label(.classes))]
pub struct UploadError {
    message: String,
    classes: Vec<FailureClass>,
}

impl UploadError {
    /// Failure matching none of the known classes
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            classes: Vec::new(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::other(message).with_class(FailureClass::Auth)
    }

    pub fn insufficient_space(message: impl Into<String>) -> Self {
        Self::other(message).with_class(FailureClass::InsufficientSpace)
    }

    pub fn with_class(mut self, class: FailureClass) -> Self {
        if !self.classes.contains(&class) {
            self.classes.push(class);
        }
        self
    }

    pub fn is_auth_failure(&self) -> bool {
        self.classes.contains(&FailureClass::Auth)
    }

    pub fn is_insufficient_space(&self) -> bool {
        self.classes.contains(&FailureClass::InsufficientSpace)
    }

    pub fn classes(&self) -> &[FailureClass] {
        &self.classes
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Short label used in logs and crash reports
    pub fn kind(&self) -> &'static str {
        kind_label(&self.classes)
    }
}

fn kind_label(classes: &[FailureClass]) -> &'static str {
    let auth = classes.contains(&FailureClass::Auth);
    let space = classes.contains(&FailureClass::InsufficientSpace);
    match (auth, space) {
        (true, true) => "auth+insufficient_space",
        (true, false) => "auth",
        (false, true) => "insufficient_space",
        (false, false) => "other",
    }
}

/// Terminal result of an upload
#[derive(Debug, Clone)]
pub enum UploadResult {
    Success,
    Failure(UploadError),
}

/// Capability to store a file with a cloud provider
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Upload `file`, waiting for the provider's terminal answer
    async fn upload_to_cloud(&self, file: &Path) -> UploadResult;

    /// Provider name (for logging)
    fn name(&self) -> &'static str;
}

/// Mock implementation for testing
/// Available for use in external test crates
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Recorded upload call
    #[derive(Clone, Debug)]
    pub struct UploadCall {
        pub file: PathBuf,
        /// Whether the file existed when the upload started
        pub file_existed: bool,
        /// File content at upload time
        pub content: Option<String>,
    }

    /// Mock cloud provider returning a configured result
    #[derive(Clone)]
    pub struct MockCloudProvider {
        pub calls: Arc<Mutex<Vec<UploadCall>>>,
        result: Arc<Mutex<UploadResult>>,
        delay: Option<Duration>,
    }

    impl Default for MockCloudProvider {
        fn default() -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                result: Arc::new(Mutex::new(UploadResult::Success)),
                delay: None,
            }
        }
    }

    impl MockCloudProvider {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every upload fail with `error`
        pub fn failing(self, error: UploadError) -> Self {
            *self.result.lock().unwrap() = UploadResult::Failure(error);
            self
        }

        /// Suspend for `delay` before answering
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn get_calls(&self) -> Vec<UploadCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn upload_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn last_file(&self) -> Option<PathBuf> {
            self.calls.lock().unwrap().last().map(|c| c.file.clone())
        }
    }

    #[async_trait]
    impl CloudProvider for MockCloudProvider {
        async fn upload_to_cloud(&self, file: &Path) -> UploadResult {
            self.calls.lock().unwrap().push(UploadCall {
                file: file.to_path_buf(),
                file_existed: file.exists(),
                content: std::fs::read_to_string(file).ok(),
            });

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            self.result.lock().unwrap().clone()
        }

        fn name(&self) -> &'static str {
            "mock"
        }
    }
}
