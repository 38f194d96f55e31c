//! Request descriptor handed to handlers.

use crate::cookies;
use crate::error::{TestError, TestResult};
use bytes::Bytes;
use cookie::Cookie;
use http::{HeaderMap, Method, Uri};
use http_body_util::Full;
use serde::de::DeserializeOwned;
use std::borrow::Cow;

/// A request under construction or in flight to a [`Handler`](crate::Handler).
///
/// An absent body (`None`) and an empty body (`Some` of zero bytes) are
/// distinct: handlers can tell whether the test supplied a body at all.
#[derive(Debug, Clone)]
pub struct TestRequest {
    /// HTTP method
    pub method: Method,
    /// Request URI (path and optional query)
    pub uri: Uri,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body
    pub body: Option<Bytes>,
}

impl Default for TestRequest {
    fn default() -> Self {
        Self::new(Method::GET, Uri::from_static("/"))
    }
}

impl TestRequest {
    /// Creates a request without headers or body.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Returns the request path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns the raw query string, if any.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Gets a header value as a string.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Returns every cookie sent with this request.
    #[must_use]
    pub fn cookies(&self) -> Vec<Cookie<'static>> {
        cookies::from_cookie_headers(&self.headers)
    }

    /// Returns the cookie with the given name, if sent.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<Cookie<'static>> {
        self.cookies().into_iter().find(|c| c.name() == name)
    }

    /// Returns the body as a string, empty when absent.
    pub fn text(&self) -> TestResult<String> {
        let bytes = self.body.clone().unwrap_or_default();
        String::from_utf8(bytes.to_vec())
            .map_err(|e| TestError::BodyRead(format!("invalid UTF-8: {e}")))
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> TestResult<T> {
        let bytes = self.body.clone().unwrap_or_default();
        serde_json::from_slice(&bytes).map_err(TestError::JsonDecode)
    }

    /// Converts this request to an HTTP request.
    ///
    /// An absent body becomes an empty one; `http::Request` has no notion of
    /// a missing body.
    pub fn to_http_request(&self) -> http::Request<Full<Bytes>> {
        let mut request = http::Request::new(Full::new(self.body.clone().unwrap_or_default()));
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = self.uri.clone();
        *request.headers_mut() = self.headers.clone();
        request
    }
}

/// Body source for a request under construction.
///
/// Converts from the usual byte containers. [`RequestBody::absent`] (or a
/// `None` option) leaves the request without a body at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestBody(Option<Bytes>);

impl RequestBody {
    /// No body.
    #[must_use]
    pub const fn absent() -> Self {
        Self(None)
    }

    /// Returns true if no body is present.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        self.0.is_none()
    }

    /// Returns the body bytes, if any.
    #[must_use]
    pub fn into_bytes(self) -> Option<Bytes> {
        self.0
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        Self(Some(bytes))
    }
}

impl From<&'static str> for RequestBody {
    fn from(text: &'static str) -> Self {
        Self(Some(Bytes::from_static(text.as_bytes())))
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        Self(Some(Bytes::from(text)))
    }
}

impl From<&'static [u8]> for RequestBody {
    fn from(bytes: &'static [u8]) -> Self {
        Self(Some(Bytes::from_static(bytes)))
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Some(Bytes::from(bytes)))
    }
}

impl<T: Into<Bytes>> From<Option<T>> for RequestBody {
    fn from(body: Option<T>) -> Self {
        Self(body.map(Into::into))
    }
}

/// Roots a relative URL at `/`.
///
/// `"users?x=1"` becomes `"/users?x=1"` and the empty string becomes `"/"`.
/// Absolute URLs (with a scheme) and rooted paths pass through unchanged.
pub(crate) fn normalize_url(url: &str) -> Cow<'_, str> {
    if url.starts_with('/') || url.contains("://") {
        return Cow::Borrowed(url);
    }
    Cow::Owned(format!("/{url}"))
}

/// Parses a request URL (path plus optional query).
pub(crate) fn parse_url(url: &str) -> TestResult<Uri> {
    let invalid = |reason: String| TestError::InvalidUrl {
        url: url.to_string(),
        reason,
    };

    let uri = normalize_url(url)
        .parse::<Uri>()
        .map_err(|e| invalid(e.to_string()))?;
    if uri.authority().is_some() && uri.scheme().is_none() {
        return Err(invalid("host without scheme".to_string()));
    }
    Ok(uri)
}
