//! Request building.
//!
//! Every builder call lazily creates the cycle's request (`GET /`, no body)
//! if none is pending, ends the executed window of the previous cycle and
//! drops its structured result. The `*_with_state` variants compute their
//! arguments from the current [`State`] and then delegate to the plain call.

use crate::cookies;
use crate::error::{TestError, TestResult};
use crate::request::{normalize_url, parse_url, RequestBody};
use crate::state::State;
use crate::tester::Tester;
use bytes::Bytes;
use cookie::Cookie;
use http::{header, HeaderName, HeaderValue, Method};
use serde::Serialize;
use std::any::Any;
use std::io::Read;

impl Tester {
    /// Configures the pending request's method, URL and body.
    ///
    /// The URL is a path with an optional query string, resolved against the
    /// configured base path. Relative paths are rooted at `/` and an empty URL
    /// means `/`. A URL that does not parse is fatal.
    pub fn new_request(
        &mut self,
        method: Method,
        url: impl AsRef<str>,
        body: impl Into<RequestBody>,
    ) -> TestResult<&mut Self> {
        self.ensure_live()?;
        let resolved = self.config().resolve_url(&normalize_url(url.as_ref()));
        let uri = self.check(parse_url(&resolved))?;
        let body = body.into().into_bytes();

        tracing::debug!(%method, %uri, has_body = body.is_some(), "building request");

        let request = self.pending_request();
        request.method = method;
        request.uri = uri;
        request.body = body;
        Ok(self)
    }

    /// Like [`new_request`](Self::new_request) with arguments computed from
    /// the current state.
    pub fn new_request_with_state<F, U, B>(&mut self, f: F) -> TestResult<&mut Self>
    where
        F: FnOnce(&State) -> (Method, U, B),
        U: AsRef<str>,
        B: Into<RequestBody>,
    {
        self.ensure_live()?;
        let (method, url, body) = f(&self.state);
        self.new_request(method, url, body)
    }

    /// Starts a GET request.
    pub fn get(&mut self, url: impl AsRef<str>) -> TestResult<&mut Self> {
        self.new_request(Method::GET, url, RequestBody::absent())
    }

    /// Starts a GET request to a URL computed from the current state.
    pub fn get_with_state<F, U>(&mut self, f: F) -> TestResult<&mut Self>
    where
        F: FnOnce(&State) -> U,
        U: AsRef<str>,
    {
        self.ensure_live()?;
        let url = f(&self.state);
        self.get(url)
    }

    /// Starts a POST request.
    pub fn post(&mut self, url: impl AsRef<str>, body: impl Into<RequestBody>) -> TestResult<&mut Self> {
        self.new_request(Method::POST, url, body)
    }

    /// Starts a POST request with URL and body computed from the current state.
    pub fn post_with_state<F, U, B>(&mut self, f: F) -> TestResult<&mut Self>
    where
        F: FnOnce(&State) -> (U, B),
        U: AsRef<str>,
        B: Into<RequestBody>,
    {
        self.ensure_live()?;
        let (url, body) = f(&self.state);
        self.post(url, body)
    }

    /// Starts a PUT request.
    pub fn put(&mut self, url: impl AsRef<str>, body: impl Into<RequestBody>) -> TestResult<&mut Self> {
        self.new_request(Method::PUT, url, body)
    }

    /// Starts a PUT request with URL and body computed from the current state.
    pub fn put_with_state<F, U, B>(&mut self, f: F) -> TestResult<&mut Self>
    where
        F: FnOnce(&State) -> (U, B),
        U: AsRef<str>,
        B: Into<RequestBody>,
    {
        self.ensure_live()?;
        let (url, body) = f(&self.state);
        self.put(url, body)
    }

    /// Starts a PATCH request.
    pub fn patch(&mut self, url: impl AsRef<str>, body: impl Into<RequestBody>) -> TestResult<&mut Self> {
        self.new_request(Method::PATCH, url, body)
    }

    /// Starts a PATCH request with URL and body computed from the current state.
    pub fn patch_with_state<F, U, B>(&mut self, f: F) -> TestResult<&mut Self>
    where
        F: FnOnce(&State) -> (U, B),
        U: AsRef<str>,
        B: Into<RequestBody>,
    {
        self.ensure_live()?;
        let (url, body) = f(&self.state);
        self.patch(url, body)
    }

    /// Starts a DELETE request.
    pub fn delete(&mut self, url: impl AsRef<str>) -> TestResult<&mut Self> {
        self.new_request(Method::DELETE, url, RequestBody::absent())
    }

    /// Starts a DELETE request to a URL computed from the current state.
    pub fn delete_with_state<F, U>(&mut self, f: F) -> TestResult<&mut Self>
    where
        F: FnOnce(&State) -> U,
        U: AsRef<str>,
    {
        self.ensure_live()?;
        let url = f(&self.state);
        self.delete(url)
    }

    /// Replaces the pending request's body.
    pub fn set_body(&mut self, body: impl Into<RequestBody>) -> TestResult<&mut Self> {
        self.ensure_live()?;
        self.pending_request().body = body.into().into_bytes();
        Ok(self)
    }

    /// Replaces the body with one computed from the current state.
    pub fn set_body_with_state<F, B>(&mut self, f: F) -> TestResult<&mut Self>
    where
        F: FnOnce(&State) -> B,
        B: Into<RequestBody>,
    {
        self.ensure_live()?;
        let body = f(&self.state);
        self.set_body(body)
    }

    /// Reads `reader` to the end and uses the bytes as the body.
    ///
    /// A read error is fatal.
    pub fn set_body_reader(&mut self, mut reader: impl Read) -> TestResult<&mut Self> {
        self.ensure_live()?;
        let mut buffer = Vec::new();
        let read = reader
            .read_to_end(&mut buffer)
            .map_err(|e| TestError::BodyRead(e.to_string()));
        self.check(read)?;
        self.set_body(Bytes::from(buffer))
    }

    /// Serializes `value` as the JSON body and sets `Content-Type`.
    ///
    /// A value that cannot be encoded is fatal.
    pub fn set_json_body<T: Serialize + ?Sized>(&mut self, value: &T) -> TestResult<&mut Self> {
        self.ensure_live()?;
        let encoded = serde_json::to_vec(value).map_err(TestError::JsonEncode);
        let encoded = self.check(encoded)?;

        let request = self.pending_request();
        request.body = Some(Bytes::from(encoded));
        request.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Ok(self)
    }

    /// Sets a header on the pending request, replacing any previous value.
    ///
    /// An invalid name or value is fatal.
    pub fn add_header(&mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> TestResult<&mut Self> {
        self.ensure_live()?;
        let (name, value) = (name.as_ref(), value.as_ref());
        let parsed = match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => Ok((name, value)),
            (Err(e), _) => Err(TestError::InvalidHeader(format!("name {name:?}: {e}"))),
            (_, Err(e)) => Err(TestError::InvalidHeader(format!("value for {name:?}: {e}"))),
        };
        let (name, value) = self.check(parsed)?;

        self.pending_request().headers.insert(name, value);
        Ok(self)
    }

    /// Sets a header computed from the current state.
    pub fn add_header_with_state<F, K, V>(&mut self, f: F) -> TestResult<&mut Self>
    where
        F: FnOnce(&State) -> (K, V),
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.ensure_live()?;
        let (name, value) = f(&self.state);
        self.add_header(name, value)
    }

    /// Adds a cookie to the pending request.
    ///
    /// The cookie is sent with this request only; later requests receive
    /// cookies through response forwarding.
    pub fn add_cookie(&mut self, cookie: &Cookie<'_>) -> TestResult<&mut Self> {
        self.ensure_live()?;
        let appended = cookies::append_to_request(&mut self.pending_request().headers, cookie);
        self.check(appended)?;
        Ok(self)
    }

    /// Adds a cookie computed from the current state.
    pub fn add_cookie_with_state<F>(&mut self, f: F) -> TestResult<&mut Self>
    where
        F: FnOnce(&State) -> Cookie<'static>,
    {
        self.ensure_live()?;
        let cookie = f(&self.state);
        self.add_cookie(&cookie)
    }

    /// Stores a value for later `*_with_state` closures.
    ///
    /// Does not touch the pending request.
    pub fn set_value<T: Any>(&mut self, key: impl Into<String>, value: T) -> TestResult<&mut Self> {
        self.ensure_live()?;
        self.state.values.insert(key, value);
        Ok(self)
    }

    /// Stores a value computed from the current state.
    pub fn set_value_with_state<F, K, T>(&mut self, f: F) -> TestResult<&mut Self>
    where
        F: FnOnce(&State) -> (K, T),
        K: Into<String>,
        T: Any,
    {
        self.ensure_live()?;
        let (key, value) = f(&self.state);
        self.set_value(key, value)
    }
}
