//! Tester configuration.
//!
//! A suite that exercises one service usually wants the same defaults in
//! every test. [`TesterConfig`] collects them and can be loaded from TOML:
//!
//! ```toml
//! forward_cookies = true
//! base_path = "/api/v1"
//! default_headers = [["accept", "application/json"]]
//! ```

use crate::error::{TestError, TestResult};
use http::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

/// Settings applied by a [`Tester`](crate::Tester) to every cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TesterConfig {
    /// Headers added to every newly started request.
    pub default_headers: Vec<(String, String)>,

    /// Copy cookies from the previous response onto the next request.
    pub forward_cookies: bool,

    /// Prefix for request URLs that start with `/`.
    pub base_path: String,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            default_headers: Vec::new(),
            forward_cookies: true,
            base_path: String::new(),
        }
    }
}

impl TesterConfig {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```
    /// use httpchain::TesterConfig;
    ///
    /// let config = TesterConfig::builder()
    ///     .default_header("accept", "application/json")
    ///     .base_path("/api")
    ///     .build();
    ///
    /// assert_eq!(config.base_path, "/api");
    /// assert!(config.forward_cookies);
    /// ```
    #[must_use]
    pub fn builder() -> TesterConfigBuilder {
        TesterConfigBuilder::default()
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> TestResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| TestError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `TestError::Config` if:
    /// - a default header name or value is not valid HTTP
    /// - the base path is non-empty and does not start with `/`
    pub fn validate(&self) -> TestResult<()> {
        for (name, value) in &self.default_headers {
            HeaderName::try_from(name.as_str())
                .map_err(|e| TestError::Config(format!("default header name {name:?}: {e}")))?;
            HeaderValue::try_from(value.as_str())
                .map_err(|e| TestError::Config(format!("default header {name:?} value: {e}")))?;
        }

        if !self.base_path.is_empty() && !self.base_path.starts_with('/') {
            return Err(TestError::Config(format!(
                "base_path {:?} must start with '/'",
                self.base_path
            )));
        }

        Ok(())
    }

    /// Applies `base_path` to a request URL.
    pub(crate) fn resolve_url(&self, url: &str) -> String {
        if self.base_path.is_empty() || !url.starts_with('/') {
            return url.to_string();
        }
        format!("{}{url}", self.base_path.trim_end_matches('/'))
    }
}

/// Builder for [`TesterConfig`].
#[derive(Debug, Default)]
#[must_use]
pub struct TesterConfigBuilder {
    config: TesterConfig,
}

impl TesterConfigBuilder {
    /// Adds a header sent with every request.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config
            .default_headers
            .push((name.into(), value.into()));
        self
    }

    /// Enables or disables cookie forwarding between cycles.
    pub fn forward_cookies(mut self, enabled: bool) -> Self {
        self.config.forward_cookies = enabled;
        self
    }

    /// Sets the URL prefix.
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.config.base_path = base_path.into();
        self
    }

    /// Build the configuration.
    pub fn build(self) -> TesterConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TesterConfig::default();
        assert!(config.forward_cookies);
        assert!(config.default_headers.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let config = TesterConfig::from_toml_str(
            r#"
            forward_cookies = false
            base_path = "/api/v1"
            default_headers = [["accept", "application/json"]]
            "#,
        )
        .unwrap();

        assert!(!config.forward_cookies);
        assert_eq!(config.base_path, "/api/v1");
        assert_eq!(
            config.default_headers,
            vec![("accept".to_string(), "application/json".to_string())]
        );
    }

    #[test]
    fn test_from_toml_partial_uses_defaults() {
        let config = TesterConfig::from_toml_str("base_path = \"/v2\"").unwrap();
        assert!(config.forward_cookies);
        assert_eq!(config.base_path, "/v2");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = TesterConfig::from_toml_str("timeout = 5").unwrap_err();
        assert!(matches!(err, TestError::Config(_)));
    }

    #[test]
    fn test_invalid_header_rejected() {
        let config = TesterConfig::builder()
            .default_header("bad header", "x")
            .build();
        assert!(matches!(config.validate(), Err(TestError::Config(_))));
    }

    #[test]
    fn test_relative_base_path_rejected() {
        let config = TesterConfig::builder().base_path("api").build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_url() {
        let config = TesterConfig::builder().base_path("/api/").build();
        assert_eq!(config.resolve_url("/users"), "/api/users");
        assert_eq!(config.resolve_url("users"), "users");
        assert_eq!(TesterConfig::default().resolve_url("/users"), "/users");
    }
}
