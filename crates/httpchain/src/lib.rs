//! # httpchain
//!
//! Chained, in-process HTTP testing. A [`Tester`] builds a request, runs it
//! synchronously against a [`Handler`], and asserts on the response, then
//! carries cookies and captured values forward into the next request of the
//! same test. No sockets are opened.
//!
//! ## Key Features
//!
//! - **In-Memory Dispatch**: Handlers write into a [`ResponseRecorder`]
//! - **Cookie Chaining**: Cookies set by one response are sent with the next request
//! - **State-Aware Building**: `*_with_state` builders read earlier responses and stored values
//! - **Fail Fast**: The first failure is reported once and aborts the tester
//! - **JSON Support**: Encode request bodies and decode response bodies with serde
//!
//! ## Example
//!
//! ```
//! use httpchain::{Cookie, ResponseRecorder, TestRequest, TestResult, Tester};
//! use http::StatusCode;
//!
//! fn app(recorder: &mut ResponseRecorder, request: &TestRequest) {
//!     match request.path() {
//!         "/login" => {
//!             recorder.set_cookie(&Cookie::new("session", "abc123"));
//!             recorder.write("logged in");
//!         }
//!         "/me" if request.cookie("session").is_some() => recorder.write("alice"),
//!         _ => recorder.set_status(StatusCode::UNAUTHORIZED),
//!     }
//! }
//!
//! fn scenario() -> TestResult<()> {
//!     let mut tester = Tester::new(app);
//!
//!     tester.post("/login", "user=alice")?.execute()?;
//!     tester.assert_status_code(200)?.assert_cookie_value("session", "abc123")?;
//!
//!     // The session cookie is forwarded automatically.
//!     tester.get("/me")?.execute()?;
//!     tester.assert_status("200 OK")?.assert_body("alice")?;
//!     Ok(())
//! }
//! # scenario().unwrap();
//! ```

#![doc(html_root_url = "https://docs.rs/httpchain/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod assert;
mod builder;
pub mod config;
mod cookies;
mod error;
mod handler;
pub mod logging;
mod reporter;
mod request;
mod response;
mod state;
mod tester;

pub use cookie::{Cookie, SameSite};
pub use config::{TesterConfig, TesterConfigBuilder};
pub use error::{TestError, TestResult};
pub use handler::{AsyncHandler, Handler, ResponseRecorder};
pub use reporter::{FailureReporter, LogReporter, PanicReporter, RecordingReporter};
pub use request::{RequestBody, TestRequest};
pub use response::TestResponse;
pub use state::{State, Values};
pub use tester::Tester;
