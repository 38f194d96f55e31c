//! Assertions over the most recent response.
//!
//! Each assertion requires that the current cycle was executed. Assertions
//! only read the response, so repeating one for the same response gives the
//! same outcome.

use crate::cookies;
use crate::error::{TestError, TestResult};
use crate::response::TestResponse;
use crate::tester::Tester;
use cookie::Cookie;
use serde::de::DeserializeOwned;
use std::fmt::Debug;

impl Tester {
    /// Runs `check` against the executed response, failing if the cycle was
    /// not executed.
    fn verify<F>(&mut self, check: F) -> TestResult<&mut Self>
    where
        F: FnOnce(&TestResponse) -> TestResult<()>,
    {
        self.ensure_live()?;
        let outcome = match (self.executed, self.state.response.as_ref()) {
            (true, Some(response)) => check(response),
            _ => Err(TestError::NotExecuted {
                url: self.pending_url(),
            }),
        };
        tracing::debug!(passed = outcome.is_ok(), "assertion evaluated");
        self.check(outcome)?;
        Ok(self)
    }

    /// Decodes the executed response body as `T` and stores the result in
    /// the state. Returns a reference to the stored value.
    fn decode_response<T>(&mut self) -> TestResult<&T>
    where
        T: DeserializeOwned + 'static,
    {
        self.ensure_live()?;
        let decoded = match (self.executed, self.state.response.as_ref()) {
            (true, Some(response)) => response.json::<T>(),
            _ => Err(TestError::NotExecuted {
                url: self.pending_url(),
            }),
        };
        let decoded = self.check(decoded)?;
        tracing::debug!(target_type = std::any::type_name::<T>(), "decoded response body");

        let stored = self.state.response_result.insert(Box::new(decoded));
        stored.downcast_ref::<T>().ok_or_else(|| TestError::ValueType {
            key: "response_result".to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    /// Returns the executed response for ad-hoc inspection.
    pub fn response(&mut self) -> TestResult<&TestResponse> {
        self.verify(|_| Ok(()))?;
        self.state.response.as_ref().ok_or_else(|| TestError::NotExecuted {
            url: "/".to_string(),
        })
    }

    /// Asserts the status line, e.g. `"200 OK"`.
    pub fn assert_status(&mut self, expected: impl AsRef<str>) -> TestResult<&mut Self> {
        let expected = expected.as_ref();
        self.verify(|response| {
            let actual = response.status_line();
            if actual == expected {
                return Ok(());
            }
            Err(TestError::StatusMismatch {
                expected: expected.to_string(),
                actual,
            })
        })
    }

    /// Asserts the numeric status code.
    pub fn assert_status_code(&mut self, expected: u16) -> TestResult<&mut Self> {
        self.verify(|response| {
            let actual = response.status_code();
            if actual == expected {
                return Ok(());
            }
            Err(TestError::StatusCodeMismatch { expected, actual })
        })
    }

    /// Asserts the first value of a response header.
    ///
    /// A missing header compares as the empty string.
    pub fn assert_header(
        &mut self,
        name: impl AsRef<str>,
        expected: impl AsRef<str>,
    ) -> TestResult<&mut Self> {
        let (name, expected) = (name.as_ref(), expected.as_ref());
        self.verify(|response| {
            let actual = response.header_str(name).unwrap_or_default();
            if actual == expected {
                return Ok(());
            }
            Err(TestError::HeaderMismatch {
                name: name.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            })
        })
    }

    /// Asserts the response sets a cookie named `name`.
    pub fn assert_cookie_exists(&mut self, name: impl AsRef<str>) -> TestResult<&mut Self> {
        let name = name.as_ref();
        self.verify(|response| {
            let set = response.cookies();
            cookies::find(&set, name)
                .map(|_| ())
                .ok_or_else(|| TestError::CookieNotFound(name.to_string()))
        })
    }

    /// Asserts the response sets cookie `name` to `expected`.
    pub fn assert_cookie_value(
        &mut self,
        name: impl AsRef<str>,
        expected: impl AsRef<str>,
    ) -> TestResult<&mut Self> {
        let (name, expected) = (name.as_ref(), expected.as_ref());
        self.verify(|response| {
            let set = response.cookies();
            let cookie = cookies::find(&set, name)
                .ok_or_else(|| TestError::CookieNotFound(name.to_string()))?;
            if cookie.value() == expected {
                return Ok(());
            }
            Err(TestError::CookieValueMismatch {
                name: name.to_string(),
                expected: expected.to_string(),
                actual: cookie.value().to_string(),
            })
        })
    }

    /// Asserts the response sets a cookie identical to `expected`, attributes
    /// included.
    ///
    /// Cookies are compared in their serialized `Set-Cookie` form. The
    /// expected cookie must have a name.
    pub fn assert_cookie_eq(&mut self, expected: &Cookie<'_>) -> TestResult<&mut Self> {
        self.verify(|response| {
            if expected.name().is_empty() {
                return Err(TestError::EmptyCookieName);
            }
            let set = response.cookies();
            let found = cookies::find(&set, expected.name())
                .ok_or_else(|| TestError::CookieNotFound(expected.name().to_string()))?;

            let (expected, actual) = (expected.to_string(), found.to_string());
            if expected == actual {
                return Ok(());
            }
            Err(TestError::CookieMismatch { expected, actual })
        })
    }

    /// Asserts the full response body.
    pub fn assert_body(&mut self, expected: impl AsRef<[u8]>) -> TestResult<&mut Self> {
        let expected = expected.as_ref();
        self.verify(|response| {
            let actual = response.body().as_ref();
            if actual == expected {
                return Ok(());
            }
            Err(TestError::BodyMismatch {
                expected: String::from_utf8_lossy(expected).into_owned(),
                actual: String::from_utf8_lossy(actual).into_owned(),
            })
        })
    }

    /// Decodes the JSON body into `T` and asserts `predicate` holds for it.
    ///
    /// The decoded value is stored in the state whether or not the predicate
    /// passes; read it with [`State::response_result`](crate::State::response_result).
    pub fn assert_struct<T, P>(&mut self, predicate: P) -> TestResult<&mut Self>
    where
        T: DeserializeOwned + Debug + 'static,
        P: FnOnce(&T) -> bool,
    {
        let decoded = self.decode_response::<T>()?;
        let failure = (!predicate(decoded)).then(|| TestError::PredicateFailed {
            decoded: format!("{decoded:?}"),
        });

        if let Some(error) = failure {
            return self.fatal(error);
        }
        Ok(self)
    }

    /// Decodes the JSON body into `T` and asserts it equals `expected`.
    ///
    /// The decoded value is stored in the state before comparing.
    pub fn assert_struct_eq<T>(&mut self, expected: &T) -> TestResult<&mut Self>
    where
        T: DeserializeOwned + PartialEq + Debug + 'static,
    {
        let decoded = self.decode_response::<T>()?;
        let failure = (decoded != expected).then(|| TestError::StructMismatch {
            expected: format!("{expected:?}"),
            actual: format!("{decoded:?}"),
        });

        if let Some(error) = failure {
            return self.fatal(error);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::TestError;
    use crate::handler::ResponseRecorder;
    use crate::reporter::RecordingReporter;
    use crate::request::TestRequest;
    use crate::tester::Tester;
    use cookie::Cookie;
    use http::{header, HeaderValue, StatusCode};
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Deserialize)]
    struct TestStruct {
        value: String,
    }

    fn tester_with<H>(handler: H) -> (Tester, RecordingReporter)
    where
        H: Fn(&mut ResponseRecorder, &TestRequest) + 'static,
    {
        let reporter = RecordingReporter::new();
        (Tester::with_reporter(handler, reporter.clone()), reporter)
    }

    fn executed<H>(handler: H) -> (Tester, RecordingReporter)
    where
        H: Fn(&mut ResponseRecorder, &TestRequest) + 'static,
    {
        let (mut tester, reporter) = tester_with(handler);
        tester.get("/get").unwrap().execute().unwrap();
        (tester, reporter)
    }

    fn ok(recorder: &mut ResponseRecorder, _: &TestRequest) {
        recorder.write("Ok");
    }

    fn json_value(recorder: &mut ResponseRecorder, _: &TestRequest) {
        recorder.write(r#"{"value": "123"}"#);
    }

    fn with_cookie(recorder: &mut ResponseRecorder, _: &TestRequest) {
        let cookie = Cookie::build(("TestCookie", "123")).path("/").http_only(true).build();
        recorder.set_cookie(&cookie);
        recorder.write("Ok");
    }

    #[test]
    fn test_every_assertion_requires_execute() {
        type Assertion = fn(&mut Tester) -> bool;
        let assertions: Vec<Assertion> = vec![
            |t| t.assert_status("200 OK").is_err(),
            |t| t.assert_status_code(200).is_err(),
            |t| t.assert_header("X", "").is_err(),
            |t| t.assert_cookie_exists("TestCookie").is_err(),
            |t| t.assert_cookie_value("TestCookie", "123").is_err(),
            |t| t.assert_cookie_eq(&Cookie::new("TestCookie", "123")).is_err(),
            |t| t.assert_body("Ok").is_err(),
            |t| t.assert_struct::<TestStruct, _>(|_| true).is_err(),
            |t| t.assert_struct_eq(&TestStruct { value: "123".into() }).is_err(),
            |t| t.response().is_err(),
        ];

        for assertion in assertions {
            let (mut tester, reporter) = tester_with(with_cookie);
            tester.get("/get").unwrap();
            assert!(assertion(&mut tester));
            assert!(reporter.last().unwrap().contains("was not executed"));
        }
    }

    #[test]
    fn test_assert_after_new_build_requires_execute() {
        let (mut tester, reporter) = executed(ok);
        tester.get("/next").unwrap();
        let err = tester.assert_status_code(200).unwrap_err();
        assert!(matches!(err, TestError::NotExecuted { ref url } if url == "/next"));
        assert!(reporter.failed());
    }

    #[test]
    fn test_assert_status() {
        let (mut tester, reporter) = executed(ok);
        tester.assert_status("200 OK").unwrap();
        assert!(!reporter.failed());

        let err = tester.assert_status("404 Not Found").unwrap_err();
        assert!(matches!(err, TestError::StatusMismatch { .. }));
    }

    #[test]
    fn test_assert_status_without_reason_phrase() {
        let (mut tester, _) = executed(|recorder: &mut ResponseRecorder, _: &TestRequest| {
            recorder.set_status(StatusCode::from_u16(599).unwrap());
        });
        tester.assert_status("599 ").unwrap();
    }

    #[test]
    fn test_assert_struct_ignores_trailing_documents() {
        let (mut tester, _) = executed(|recorder: &mut ResponseRecorder, _: &TestRequest| {
            recorder.write("{\"value\":\"123\"}\n{\"x\":1}");
        });
        tester
            .assert_struct_eq(&TestStruct { value: "123".into() })
            .unwrap();
    }

    #[test]
    fn test_assert_status_code() {
        let (mut tester, _) = executed(|recorder: &mut ResponseRecorder, _: &TestRequest| {
            recorder.set_status(StatusCode::UNAUTHORIZED);
        });
        tester.assert_status_code(401).unwrap();
        assert!(tester.assert_status_code(200).is_err());
    }

    #[test]
    fn test_assert_header() {
        let (mut tester, reporter) = executed(|recorder: &mut ResponseRecorder, _: &TestRequest| {
            recorder.insert_header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
            recorder.write("Ok");
        });
        tester.assert_header("Content-Type", "text/plain").unwrap();
        tester.assert_header("X-Missing", "").unwrap();

        let err = tester.assert_header("content-type", "application/json").unwrap_err();
        assert!(matches!(err, TestError::HeaderMismatch { ref actual, .. } if actual == "text/plain"));
        assert_eq!(reporter.messages().len(), 1);
    }

    #[test]
    fn test_assert_cookie_exists() {
        let (mut tester, _) = executed(with_cookie);
        tester.assert_cookie_exists("TestCookie").unwrap();

        let err = tester.assert_cookie_exists("Missing").unwrap_err();
        assert!(matches!(err, TestError::CookieNotFound(ref name) if name == "Missing"));
    }

    #[test]
    fn test_assert_cookie_value() {
        let (mut tester, _) = executed(with_cookie);
        tester.assert_cookie_value("TestCookie", "123").unwrap();
        assert!(matches!(
            tester.assert_cookie_value("TestCookie", "456"),
            Err(TestError::CookieValueMismatch { .. })
        ));
    }

    #[test]
    fn test_assert_cookie_value_missing() {
        let (mut tester, _) = executed(ok);
        assert!(matches!(
            tester.assert_cookie_value("TestCookie", "123"),
            Err(TestError::CookieNotFound(_))
        ));
    }

    #[test]
    fn test_assert_cookie_eq_passes() {
        let (mut tester, reporter) = executed(with_cookie);
        let expected = Cookie::build(("TestCookie", "123")).path("/").http_only(true).build();
        tester.assert_cookie_eq(&expected).unwrap();
        assert!(!reporter.failed());
    }

    #[test]
    fn test_assert_cookie_eq_empty_name() {
        let (mut tester, _) = executed(with_cookie);
        assert!(matches!(
            tester.assert_cookie_eq(&Cookie::new("", "123")),
            Err(TestError::EmptyCookieName)
        ));
    }

    #[test]
    fn test_assert_cookie_eq_not_found() {
        let (mut tester, _) = executed(ok);
        assert!(matches!(
            tester.assert_cookie_eq(&Cookie::new("TestCookie", "123")),
            Err(TestError::CookieNotFound(_))
        ));
    }

    #[test]
    fn test_assert_cookie_eq_attribute_mismatch() {
        let (mut tester, _) = executed(with_cookie);
        let err = tester
            .assert_cookie_eq(&Cookie::new("TestCookie", "123"))
            .unwrap_err();
        assert!(matches!(err, TestError::CookieMismatch { .. }));
    }

    #[test]
    fn test_assert_body() {
        let (mut tester, _) = executed(ok);
        tester.assert_body("Ok").unwrap();
        tester.assert_body(b"Ok").unwrap();

        let err = tester.assert_body("Nope").unwrap_err();
        assert_eq!(err.to_string(), "expected body \"Nope\"; got \"Ok\"");
    }

    #[test]
    fn test_repeated_assertions_are_stateless() {
        let (mut tester, _) = executed(json_value);
        tester
            .assert_body(r#"{"value": "123"}"#)
            .unwrap()
            .assert_body(r#"{"value": "123"}"#)
            .unwrap()
            .assert_struct_eq(&TestStruct { value: "123".into() })
            .unwrap()
            .assert_struct_eq(&TestStruct { value: "123".into() })
            .unwrap();
    }

    #[test]
    fn test_assert_struct_predicate_passes_and_stores_result() {
        let (mut tester, _) = executed(json_value);
        tester
            .assert_struct::<TestStruct, _>(|body| body.value == "123")
            .unwrap();

        let stored = tester.state().response_result::<TestStruct>().unwrap();
        assert_eq!(stored.value, "123");
    }

    #[test]
    fn test_assert_struct_predicate_fails_but_stores_result() {
        let (mut tester, reporter) = executed(json_value);
        let err = tester.assert_struct::<TestStruct, _>(|_| false).unwrap_err();

        assert!(matches!(err, TestError::PredicateFailed { ref decoded } if decoded.contains("123")));
        assert!(reporter.failed());
        assert!(tester.state().response_result::<TestStruct>().is_some());
    }

    #[test]
    fn test_assert_struct_decode_error() {
        let (mut tester, _) = executed(ok);
        let err = tester.assert_struct::<TestStruct, _>(|_| true).unwrap_err();
        assert!(matches!(err, TestError::JsonDecode(_)));
        assert!(!tester.state().has_response_result());
    }

    #[test]
    fn test_assert_struct_eq_mismatch() {
        let (mut tester, _) = executed(json_value);
        let err = tester
            .assert_struct_eq(&TestStruct { value: "456".into() })
            .unwrap_err();
        assert!(matches!(err, TestError::StructMismatch { .. }));
        assert_eq!(
            tester.state().response_result::<TestStruct>().map(|s| s.value.as_str()),
            Some("123")
        );
    }

    #[test]
    fn test_response_accessor() {
        let (mut tester, _) = executed(ok);
        assert_eq!(tester.response().unwrap().text().unwrap(), "Ok");
    }
}
