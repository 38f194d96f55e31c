//! Test error types.
//!
//! Every failure a [`Tester`](crate::Tester) can hit is fatal to the current
//! test. The variants fall into two groups: construction errors (the request
//! or a decode step could not be performed at all) and assertion failures
//! (the response did not match what the test expected).

use thiserror::Error;

/// Result type alias using [`TestError`].
pub type TestResult<T> = Result<T, TestError>;

/// Errors that stop a chained HTTP test.
#[derive(Debug, Error)]
pub enum TestError {
    /// The request URL could not be parsed.
    #[error("invalid request url {url:?}: {reason}")]
    InvalidUrl {
        /// The URL as supplied by the test.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// A header name or value is not valid HTTP.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The request body could not be encoded as JSON.
    #[error("error encoding request body: {0}")]
    JsonEncode(#[source] serde_json::Error),

    /// The response body could not be decoded as JSON into the target type.
    #[error("error parsing response json: {0}")]
    JsonDecode(#[source] serde_json::Error),

    /// A body could not be read.
    #[error("body read error: {0}")]
    BodyRead(String),

    /// The tester configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A value was required from the state store but is not set.
    #[error("value {0:?} is not set")]
    MissingValue(String),

    /// A stored value exists but has a different type than requested.
    #[error("value {key:?} is not of type {expected}")]
    ValueType {
        /// Store key.
        key: String,
        /// Requested type name.
        expected: &'static str,
    },

    /// An assertion ran before the pending request was executed.
    #[error("request {url:?} was not executed")]
    NotExecuted {
        /// URL of the pending request, `/` if none was built.
        url: String,
    },

    /// Status line mismatch.
    #[error("expected status {expected:?}; got {actual:?}")]
    StatusMismatch {
        /// Expected status line.
        expected: String,
        /// Actual status line.
        actual: String,
    },

    /// Numeric status code mismatch.
    #[error("expected status code {expected}; got {actual}")]
    StatusCodeMismatch {
        /// Expected code.
        expected: u16,
        /// Actual code.
        actual: u16,
    },

    /// Header value mismatch.
    #[error("expected header {name:?} to be {expected:?}; got {actual:?}")]
    HeaderMismatch {
        /// Header name.
        name: String,
        /// Expected value.
        expected: String,
        /// Actual first value, empty if absent.
        actual: String,
    },

    /// No response cookie with the given name.
    #[error("expected to find cookie {0:?}")]
    CookieNotFound(String),

    /// Cookie value mismatch.
    #[error("expected cookie {name:?} to have value of {expected:?}; got {actual:?}")]
    CookieValueMismatch {
        /// Cookie name.
        name: String,
        /// Expected value.
        expected: String,
        /// Actual value.
        actual: String,
    },

    /// The expected cookie handed to a comparison has no name.
    #[error("expected cookie cannot have an empty name")]
    EmptyCookieName,

    /// Serialized cookie mismatch.
    #[error("expected cookie {expected}; got {actual}")]
    CookieMismatch {
        /// Expected `Set-Cookie` rendering.
        expected: String,
        /// Actual `Set-Cookie` rendering.
        actual: String,
    },

    /// Response body mismatch.
    #[error("expected body {expected:?}; got {actual:?}")]
    BodyMismatch {
        /// Expected body, lossily decoded as UTF-8.
        expected: String,
        /// Actual body, lossily decoded as UTF-8.
        actual: String,
    },

    /// A structured predicate returned `false`.
    #[error("response body did not satisfy predicate: {decoded}")]
    PredicateFailed {
        /// `Debug` rendering of the decoded body.
        decoded: String,
    },

    /// Decoded body is not equal to the expected value.
    #[error("expected {expected}; got {actual}")]
    StructMismatch {
        /// `Debug` rendering of the expected value.
        expected: String,
        /// `Debug` rendering of the decoded value.
        actual: String,
    },

    /// The tester already failed; nothing further runs.
    #[error("tester aborted after earlier failure: {0}")]
    Aborted(String),
}

impl TestError {
    /// Returns true for expected-vs-actual failures, false for errors raised
    /// while building requests or decoding bodies.
    #[must_use]
    pub const fn is_assertion(&self) -> bool {
        matches!(
            self,
            Self::NotExecuted { .. }
                | Self::StatusMismatch { .. }
                | Self::StatusCodeMismatch { .. }
                | Self::HeaderMismatch { .. }
                | Self::CookieNotFound(_)
                | Self::CookieValueMismatch { .. }
                | Self::EmptyCookieName
                | Self::CookieMismatch { .. }
                | Self::BodyMismatch { .. }
                | Self::PredicateFailed { .. }
                | Self::StructMismatch { .. }
        )
    }
}
