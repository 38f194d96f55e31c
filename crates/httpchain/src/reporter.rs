//! Failure reporting capability.
//!
//! A [`Tester`](crate::Tester) hands its first fatal error to a
//! [`FailureReporter`] before returning it. After that the tester is aborted
//! and refuses further work, so the reporter sees each failing test exactly
//! once.

use crate::error::TestError;
use parking_lot::Mutex;
use std::sync::Arc;

/// Receives the fatal error that ends a test.
pub trait FailureReporter {
    /// Called once with the first failure of a tester.
    fn fail(&self, error: &TestError);
}

/// Logs failures through `tracing` and leaves unwinding to the returned
/// `Err`. This is the default reporter.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl FailureReporter for LogReporter {
    fn fail(&self, error: &TestError) {
        tracing::error!(error = %error, assertion = error.is_assertion(), "http test failed");
    }
}

/// Panics with the failure message, aborting the test immediately.
///
/// Useful for tests that do not propagate `Result`s.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanicReporter;

impl FailureReporter for PanicReporter {
    fn fail(&self, error: &TestError) {
        panic!("{error}");
    }
}

/// Records failure messages for later inspection.
///
/// Clones share the same record, so a test can keep one handle and give the
/// other to the tester.
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingReporter {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if any failure was reported.
    #[must_use]
    pub fn failed(&self) -> bool {
        !self.messages.lock().is_empty()
    }

    /// Returns every reported message in order.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Returns the most recent message.
    #[must_use]
    pub fn last(&self) -> Option<String> {
        self.messages.lock().last().cloned()
    }
}

impl FailureReporter for RecordingReporter {
    fn fail(&self, error: &TestError) {
        self.messages.lock().push(error.to_string());
    }
}
