use std::path::PathBuf;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};

use crate::{RequestsApiError, Result, RetryPolicy};

/// TLS certificate verification mode.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// Verify against the built-in root store.
    #[default]
    Verify,
    /// Accept any certificate.
    Skip,
    /// Verify against the PEM bundle at this path only.
    CaBundle(PathBuf),
}

/// Configures how requests are sent for one endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientOptions {
    /// URL scheme placed before the base URL.
    pub scheme: String,
    /// Headers sent with every request.
    pub headers: HeaderMap,
    /// Whether 3xx responses are followed.
    pub allow_redirects: bool,
    pub verify: TlsVerification,
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Policy mounted on every request session.
    pub retry: RetryPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            scheme: "https".to_owned(),
            headers,
            allow_redirects: false,
            verify: TlsVerification::default(),
            timeout_ms: 10_000,
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientOptions {
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Adds or replaces a default header.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| RequestsApiError::config(format!("invalid header name '{name}': {err}")))?;
        let value = HeaderValue::from_str(value).map_err(|err| {
            RequestsApiError::config(format!("invalid value for header '{name}': {err}"))
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Replaces all default headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_allow_redirects(mut self, allow: bool) -> Self {
        self.allow_redirects = allow;
        self
    }

    pub fn with_verify(mut self, verify: TlsVerification) -> Self {
        self.verify = verify;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
