/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum RequestsApiError {
    /// Invalid client or retry-policy configuration, detected at construction.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Transport failure, unexpected status code or unsupported method.
    #[error("request error: {message}")]
    Request {
        /// Human-readable description of the failure.
        message: String,
        /// HTTP status code, when a response was received.
        status: Option<u16>,
        /// Underlying transport error from `reqwest`.
        #[source]
        source: Option<reqwest::Error>,
    },
}

impl RequestsApiError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
            status: None,
            source: None,
        }
    }

    pub(crate) fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
            status: Some(status),
            source: None,
        }
    }

    pub(crate) fn transport(err: reqwest::Error) -> Self {
        Self::Request {
            message: err.to_string(),
            status: err.status().map(|status| status.as_u16()),
            source: Some(err),
        }
    }

    /// Returns the HTTP status code attached to a request error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => *status,
            Self::Configuration(_) => None,
        }
    }

    /// Returns `true` for configuration errors.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
