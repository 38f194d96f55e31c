//! Handler capability and the response sink handed to it.
//!
//! A [`Handler`] is anything that can serve one [`TestRequest`] by writing
//! into a [`ResponseRecorder`]. Plain closures qualify through a blanket impl:
//!
//! ```
//! use httpchain::{ResponseRecorder, TestRequest};
//! use http::StatusCode;
//!
//! let handler = |recorder: &mut ResponseRecorder, request: &TestRequest| {
//!     if request.path() == "/missing" {
//!         recorder.set_status(StatusCode::NOT_FOUND);
//!         return;
//!     }
//!     recorder.write("Ok");
//! };
//! # let _ = handler;
//! ```
//!
//! Async handlers written against `http::Request`/`http::Response` can be
//! wrapped with [`AsyncHandler`].

use crate::request::TestRequest;
use crate::response::TestResponse;
use bytes::{Bytes, BytesMut};
use cookie::Cookie;
use http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body_util::{BodyExt, Full};
use std::fmt;
use std::future::Future;

/// Serves a single request synchronously.
pub trait Handler {
    /// Writes the response to `request` into `recorder`.
    fn serve(&self, recorder: &mut ResponseRecorder, request: &TestRequest);
}

impl<F> Handler for F
where
    F: Fn(&mut ResponseRecorder, &TestRequest),
{
    fn serve(&self, recorder: &mut ResponseRecorder, request: &TestRequest) {
        self(recorder, request);
    }
}

/// In-memory response sink.
///
/// The status defaults to `200 OK`. It can be set once; after the status is
/// set or the first body bytes are written, further status changes are
/// ignored.
#[derive(Debug, Default)]
pub struct ResponseRecorder {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the response status.
    pub fn set_status(&mut self, status: StatusCode) {
        if let Some(current) = self.status {
            tracing::warn!(%current, ignored = %status, "superfluous status write");
            return;
        }
        self.status = Some(status);
    }

    /// Returns the response headers for modification.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Sets a header, replacing any existing values.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Adds a `Set-Cookie` header for `cookie`.
    ///
    /// Cookies whose rendering is not a valid header value are dropped with a
    /// warning.
    pub fn set_cookie(&mut self, cookie: &Cookie<'_>) {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                self.headers.append(header::SET_COOKIE, value);
            }
            Err(e) => {
                tracing::warn!(cookie = cookie.name(), error = %e, "dropping invalid cookie");
            }
        }
    }

    /// Appends bytes to the response body.
    pub fn write(&mut self, bytes: impl AsRef<[u8]>) {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(bytes.as_ref());
    }

    /// Returns the status recorded so far.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Finishes recording.
    pub fn finish(self) -> TestResponse {
        let status = self.status();
        TestResponse::new(status, self.headers, self.body.freeze())
    }
}

/// Adapts an `async` handler to the synchronous [`Handler`] capability.
///
/// Each dispatch runs the future to completion on a fresh current-thread
/// tokio runtime, so it must not be used from inside another runtime.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use http_body_util::Full;
/// use httpchain::{AsyncHandler, Tester};
///
/// let handler = AsyncHandler::new(|request: http::Request<Full<Bytes>>| async move {
///     let body = format!("{} {}", request.method(), request.uri().path());
///     http::Response::new(Full::new(Bytes::from(body)))
/// });
///
/// let mut tester = Tester::new(handler);
/// tester.get("/users").unwrap().execute().unwrap();
/// tester.assert_body("GET /users").unwrap();
/// ```
pub struct AsyncHandler<F> {
    handler: F,
}

impl<F> AsyncHandler<F> {
    /// Wraps an async handler function.
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F> fmt::Debug for AsyncHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncHandler").finish_non_exhaustive()
    }
}

impl<F, Fut, B> Handler for AsyncHandler<F>
where
    F: Fn(http::Request<Full<Bytes>>) -> Fut,
    Fut: Future<Output = http::Response<B>>,
    B: BodyExt,
    B::Error: fmt::Display,
{
    fn serve(&self, recorder: &mut ResponseRecorder, request: &TestRequest) {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::error!(error = %e, "failed to start runtime for async handler");
                recorder.set_status(StatusCode::INTERNAL_SERVER_ERROR);
                recorder.write(e.to_string());
                return;
            }
        };

        let result = runtime.block_on(async {
            let response = (self.handler)(request.to_http_request()).await;
            let (parts, body) = response.into_parts();
            body.collect()
                .await
                .map(|collected| (parts, collected.to_bytes()))
                .map_err(|e| e.to_string())
        });

        match result {
            Ok((parts, body)) => {
                recorder.set_status(parts.status);
                for (name, value) in &parts.headers {
                    recorder.headers_mut().append(name.clone(), value.clone());
                }
                recorder.write(body);
            }
            Err(e) => {
                tracing::error!(error = %e, "async handler body failed");
                recorder.set_status(StatusCode::INTERNAL_SERVER_ERROR);
                recorder.write(e);
            }
        }
    }
}
