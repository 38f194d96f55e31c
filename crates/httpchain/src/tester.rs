//! The tester aggregate and its execution engine.

use crate::config::TesterConfig;
use crate::cookies;
use crate::error::{TestError, TestResult};
use crate::handler::{Handler, ResponseRecorder};
use crate::reporter::{FailureReporter, LogReporter};
use crate::request::TestRequest;
use crate::state::State;
use http::{HeaderName, HeaderValue};
use std::fmt;

/// Chains requests against one handler for the duration of a single test.
///
/// A tester moves through cycles of *build → execute → assert*. Builder calls
/// start a new request (or keep mutating the current one), [`execute`]
/// dispatches it and stores the response, and assertions inspect that
/// response. Cookies set by one response are sent with the next request.
///
/// Every fallible call returns [`TestResult`]. The first error is handed to
/// the tester's [`FailureReporter`] and aborts the tester: all later calls
/// return [`TestError::Aborted`]. Write tests that return `TestResult<()>`
/// and use `?` so the scenario stops at the first failure.
///
/// A tester is meant to be owned by one test. There is no shared or default
/// instance.
///
/// # Example
///
/// ```
/// use httpchain::{ResponseRecorder, TestRequest, TestResult, Tester};
///
/// fn scenario() -> TestResult<()> {
///     let mut tester = Tester::new(|recorder: &mut ResponseRecorder, _: &TestRequest| {
///         recorder.write("Ok");
///     });
///
///     tester.get("/get")?.execute()?;
///     tester.assert_status_code(200)?.assert_body("Ok")?;
///     Ok(())
/// }
/// # scenario().unwrap();
/// ```
///
/// [`execute`]: Tester::execute
pub struct Tester {
    handler: Box<dyn Handler>,
    reporter: Box<dyn FailureReporter>,
    config: TesterConfig,
    pub(crate) state: State,
    /// True between a completed execution and the next builder mutation.
    pub(crate) executed: bool,
    /// Message of the failure that aborted this tester.
    aborted: Option<String>,
}

impl Tester {
    /// Creates a tester that logs failures through `tracing`.
    pub fn new(handler: impl Handler + 'static) -> Self {
        Self::assemble(Box::new(handler), Box::new(LogReporter), TesterConfig::default())
    }

    /// Creates a tester with a specific failure reporter.
    pub fn with_reporter(
        handler: impl Handler + 'static,
        reporter: impl FailureReporter + 'static,
    ) -> Self {
        Self::assemble(Box::new(handler), Box::new(reporter), TesterConfig::default())
    }

    /// Creates a tester with a reporter and configuration.
    ///
    /// # Errors
    ///
    /// Returns `TestError::Config` if the configuration does not validate.
    pub fn with_config(
        handler: impl Handler + 'static,
        reporter: impl FailureReporter + 'static,
        config: TesterConfig,
    ) -> TestResult<Self> {
        config.validate()?;
        Ok(Self::assemble(Box::new(handler), Box::new(reporter), config))
    }

    fn assemble(
        handler: Box<dyn Handler>,
        reporter: Box<dyn FailureReporter>,
        config: TesterConfig,
    ) -> Self {
        Self {
            handler,
            reporter,
            config,
            state: State::default(),
            executed: false,
            aborted: None,
        }
    }

    /// Current chaining state.
    #[must_use]
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Configuration this tester was built with.
    #[must_use]
    pub fn config(&self) -> &TesterConfig {
        &self.config
    }

    /// Returns true if the last cycle was executed and no new request has
    /// started building since.
    #[must_use]
    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// Returns true once any call has failed.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    /// Executes the pending request against the handler.
    ///
    /// Cookies from the previous response are added to the request first
    /// (unless disabled in [`TesterConfig`]). If nothing was built this cycle,
    /// a default `GET /` is sent. Afterwards the response replaces the
    /// previous one and the pending request is consumed.
    pub fn execute(&mut self) -> TestResult<&mut Self> {
        self.ensure_live()?;

        let forwarded = match &self.state.response {
            Some(previous) if self.config.forward_cookies => previous.cookies(),
            _ => Vec::new(),
        };

        self.pending_request();
        let mut request = self.state.request.take().unwrap_or_default();
        for cookie in &forwarded {
            let appended = cookies::append_to_request(&mut request.headers, cookie);
            self.check(appended)?;
        }

        tracing::debug!(
            method = %request.method,
            uri = %request.uri,
            forwarded_cookies = forwarded.len(),
            "executing request"
        );

        let mut recorder = ResponseRecorder::new();
        self.handler.serve(&mut recorder, &request);
        let response = recorder.finish();

        tracing::debug!(status = response.status_code(), "request executed");

        self.executed = true;
        self.state.response = Some(response);
        self.state.request = None;
        Ok(self)
    }

    /// Starts or continues building the request for this cycle.
    ///
    /// Any builder touch ends the executed window and drops the previous
    /// structured result.
    pub(crate) fn pending_request(&mut self) -> &mut TestRequest {
        self.executed = false;
        self.state.response_result = None;

        let default_headers = &self.config.default_headers;
        self.state.request.get_or_insert_with(|| {
            let mut request = TestRequest::default();
            for (name, value) in default_headers {
                if let (Ok(name), Ok(value)) = (
                    HeaderName::try_from(name.as_str()),
                    HeaderValue::try_from(value.as_str()),
                ) {
                    request.headers.insert(name, value);
                }
            }
            request
        })
    }

    /// URL of the pending request, for diagnostics.
    pub(crate) fn pending_url(&self) -> String {
        self.state
            .request
            .as_ref()
            .map_or_else(|| "/".to_string(), |request| request.uri.to_string())
    }

    pub(crate) fn ensure_live(&self) -> TestResult<()> {
        match &self.aborted {
            Some(reason) => Err(TestError::Aborted(reason.clone())),
            None => Ok(()),
        }
    }

    /// Reports `error`, aborts the tester and returns the error.
    pub(crate) fn fatal<T>(&mut self, error: TestError) -> TestResult<T> {
        if self.aborted.is_none() {
            tracing::debug!(error = %error, "aborting tester");
            self.reporter.fail(&error);
            self.aborted = Some(error.to_string());
        }
        Err(error)
    }

    /// Passes `Ok` through and turns `Err` into a fatal failure.
    pub(crate) fn check<T>(&mut self, result: TestResult<T>) -> TestResult<T> {
        match result {
            Ok(value) => Ok(value),
            Err(error) => self.fatal(error),
        }
    }
}

impl fmt::Debug for Tester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tester")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("executed", &self.executed)
            .field("aborted", &self.aborted)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::RecordingReporter;
    use cookie::Cookie;
    use http::{header, Method, StatusCode};

    fn ok_handler(recorder: &mut ResponseRecorder, _request: &TestRequest) {
        recorder.write("Ok");
    }

    #[test]
    fn test_execute_resets_state() {
        let mut tester = Tester::new(ok_handler);
        tester.get("/get").unwrap();
        assert!(tester.state.request.is_some());

        tester.execute().unwrap();

        assert!(tester.executed);
        assert!(tester.state.response.is_some());
        assert!(tester.state.request.is_none());
    }

    #[test]
    fn test_execute_without_builder_sends_default() {
        let mut tester = Tester::new(|recorder: &mut ResponseRecorder, request: &TestRequest| {
            recorder.write(format!("{} {}", request.method, request.path()));
        });

        tester.execute().unwrap();
        assert_eq!(tester.state.response.as_ref().unwrap().text().unwrap(), "GET /");
    }

    #[test]
    fn test_execute_forwards_previous_cookies() {
        let mut tester = Tester::new(|recorder: &mut ResponseRecorder, request: &TestRequest| {
            if request.path() == "/login" {
                recorder.set_cookie(&Cookie::new("session", "abc"));
                return;
            }
            let seen = request.header_str(header::COOKIE.as_str()).unwrap_or("");
            recorder.write(seen.to_string());
        });

        tester.get("/login").unwrap().execute().unwrap();
        tester.get("/me").unwrap().execute().unwrap();

        let response = tester.state.response.as_ref().unwrap();
        assert_eq!(response.text().unwrap(), "session=abc");
    }

    #[test]
    fn test_forwarding_can_be_disabled() {
        let config = TesterConfig::builder().forward_cookies(false).build();
        let mut tester = Tester::with_config(
            |recorder: &mut ResponseRecorder, request: &TestRequest| {
                recorder.set_cookie(&Cookie::new("session", "abc"));
                if request.cookie("session").is_some() {
                    recorder.set_status(StatusCode::CONFLICT);
                }
            },
            RecordingReporter::new(),
            config,
        )
        .unwrap();

        tester.execute().unwrap();
        tester.execute().unwrap();
        assert_eq!(tester.state.response.as_ref().unwrap().status(), StatusCode::OK);
    }

    #[test]
    fn test_default_headers_applied() {
        let config = TesterConfig::builder()
            .default_header("x-tenant", "acme")
            .build();
        let mut tester = Tester::with_config(
            |recorder: &mut ResponseRecorder, request: &TestRequest| {
                recorder.write(request.header_str("x-tenant").unwrap_or("none").to_string());
            },
            RecordingReporter::new(),
            config,
        )
        .unwrap();

        tester.new_request(Method::GET, "/", crate::RequestBody::absent()).unwrap();
        assert_eq!(
            tester.state.request.as_ref().unwrap().header_str("x-tenant"),
            Some("acme")
        );
        tester.execute().unwrap();
        assert_eq!(tester.state.response.as_ref().unwrap().text().unwrap(), "acme");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TesterConfig::builder().base_path("relative").build();
        let result = Tester::with_config(ok_handler, RecordingReporter::new(), config);
        assert!(matches!(result, Err(TestError::Config(_))));
    }

    #[test]
    fn test_first_failure_reported_once_then_aborted() {
        let reporter = RecordingReporter::new();
        let mut tester = Tester::with_reporter(ok_handler, reporter.clone());

        assert!(tester.assert_status_code(200).is_err());
        assert!(tester.is_aborted());

        let err = tester.get("/again").unwrap_err();
        assert!(matches!(err, TestError::Aborted(_)));
        assert!(matches!(tester.execute(), Err(TestError::Aborted(_))));
        assert_eq!(reporter.messages().len(), 1);
    }
}
