//! Cookie helpers shared by requests, responses and the execution engine.
//!
//! Responses carry cookies in `Set-Cookie` headers, one cookie per header
//! value. Requests carry them in a single `Cookie` header as `name=value`
//! pairs separated by `; `. Parsing and rendering go through the [`cookie`]
//! crate so attribute handling matches what real clients do.

use crate::error::{TestError, TestResult};
use cookie::Cookie;
use http::{header, HeaderMap, HeaderValue};

/// Parses every `Set-Cookie` header of a response.
///
/// Values that are not valid UTF-8 or not valid cookies are skipped.
pub fn from_set_cookie_headers(headers: &HeaderMap) -> Vec<Cookie<'static>> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| {
            let raw = value.to_str().ok()?;
            match Cookie::parse(raw) {
                Ok(cookie) => Some(cookie.into_owned()),
                Err(e) => {
                    tracing::warn!(header = raw, error = %e, "skipping malformed set-cookie header");
                    None
                }
            }
        })
        .collect()
}

/// Parses the `Cookie` header(s) of a request into individual cookies.
pub fn from_cookie_headers(headers: &HeaderMap) -> Vec<Cookie<'static>> {
    let mut cookies = Vec::new();
    for value in &headers.get_all(header::COOKIE) {
        let Ok(raw) = value.to_str() else {
            continue;
        };
        for pair in raw.split(';') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            if let Ok(cookie) = Cookie::parse(pair) {
                cookies.push(cookie.into_owned());
            }
        }
    }
    cookies
}

/// Finds a cookie by name.
pub fn find<'a>(cookies: &'a [Cookie<'static>], name: &str) -> Option<&'a Cookie<'static>> {
    cookies.iter().find(|cookie| cookie.name() == name)
}

/// Appends `name=value` to the request's `Cookie` header.
///
/// Attributes such as `Path` or `HttpOnly` are response-only and are dropped.
pub fn append_to_request(headers: &mut HeaderMap, cookie: &Cookie<'_>) -> TestResult<()> {
    let pair = format!("{}={}", cookie.name(), cookie.value());
    let combined = match headers.get(header::COOKIE).map(HeaderValue::to_str) {
        Some(Ok(existing)) if !existing.is_empty() => format!("{existing}; {pair}"),
        _ => pair,
    };
    let value = HeaderValue::from_str(&combined)
        .map_err(|e| TestError::InvalidHeader(format!("cookie {:?}: {e}", cookie.name())))?;
    headers.insert(header::COOKIE, value);
    Ok(())
}
