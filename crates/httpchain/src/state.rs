//! Chaining state threaded through every builder call.

use crate::error::{TestError, TestResult};
use crate::request::TestRequest;
use crate::response::TestResponse;
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;

/// Free-form key/value store that survives the whole test.
///
/// Values keep their concrete type; reads are explicit downcasts that fail
/// when the stored type differs from the requested one.
#[derive(Default)]
pub struct Values {
    entries: HashMap<String, Box<dyn Any>>,
}

impl Values {
    /// Stores `value` under `key`, replacing any previous entry.
    pub fn insert<T: Any>(&mut self, key: impl Into<String>, value: T) {
        self.entries.insert(key.into(), Box::new(value));
    }

    /// Returns the value under `key` if it exists and has type `T`.
    #[must_use]
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.entries.get(key)?.downcast_ref::<T>()
    }

    /// Returns the value under `key`, or an error naming why it is unusable.
    pub fn require<T: Any>(&self, key: &str) -> TestResult<&T> {
        let entry = self
            .entries
            .get(key)
            .ok_or_else(|| TestError::MissingValue(key.to_string()))?;
        entry.downcast_ref::<T>().ok_or_else(|| TestError::ValueType {
            key: key.to_string(),
            expected: type_name::<T>(),
        })
    }

    /// Returns true if `key` has been set.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the stored keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Values {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

/// Snapshot of the current chain, passed to every `*_with_state` closure.
#[derive(Default)]
pub struct State {
    pub(crate) request: Option<TestRequest>,
    pub(crate) response: Option<TestResponse>,
    pub(crate) response_result: Option<Box<dyn Any>>,
    pub(crate) values: Values,
}

impl State {
    /// The request being built, if any.
    #[must_use]
    pub fn request(&self) -> Option<&TestRequest> {
        self.request.as_ref()
    }

    /// The most recent response, if a request has been executed.
    #[must_use]
    pub fn response(&self) -> Option<&TestResponse> {
        self.response.as_ref()
    }

    /// The body decoded by the last structured assertion, if it had type `T`.
    ///
    /// Cleared as soon as a new request starts building.
    #[must_use]
    pub fn response_result<T: Any>(&self) -> Option<&T> {
        self.response_result.as_ref()?.downcast_ref::<T>()
    }

    /// Returns true if a structured assertion result is held.
    #[must_use]
    pub fn has_response_result(&self) -> bool {
        self.response_result.is_some()
    }

    /// The value store.
    #[must_use]
    pub fn values(&self) -> &Values {
        &self.values
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("request", &self.request)
            .field("response", &self.response)
            .field("has_response_result", &self.response_result.is_some())
            .field("values", &self.values)
            .finish()
    }
}
