//! Expected success status codes per HTTP method.
//!
//! See <https://www.rfc-editor.org/rfc/rfc9110#section-9> for the method
//! semantics the table follows.

use reqwest::StatusCode;

use crate::{Method, RequestsApiError, Result};

/// How to treat a method name missing from the expectation table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Strictness {
    /// Unknown methods are a request error.
    #[default]
    Reject,
    /// Unknown methods expect `200`.
    Fallback,
}

const FALLBACK: &[u16] = &[200];

impl Method {
    /// Status codes accepted as success when the caller gives no override.
    pub fn expected_status_codes(self) -> &'static [u16] {
        match self {
            Self::Get | Self::Head => &[200],
            Self::Post => &[200, 201, 204],
            Self::Put | Self::Delete => &[200, 202, 204],
            Self::Patch => &[200, 204],
        }
    }
}

/// Looks up the expected status codes for a method name.
pub fn expected_status_codes(method: &str, strictness: Strictness) -> Result<&'static [u16]> {
    match (method.parse::<Method>(), strictness) {
        (Ok(method), _) => Ok(method.expected_status_codes()),
        (Err(_), Strictness::Fallback) => Ok(FALLBACK),
        (Err(err), Strictness::Reject) => Err(err),
    }
}

/// Fails unless `status` is one of `expected`.
pub(crate) fn ensure_expected(status: StatusCode, expected: &[u16]) -> Result<()> {
    if expected.contains(&status.as_u16()) {
        return Ok(());
    }
    let reason = status.canonical_reason().unwrap_or("");
    Err(RequestsApiError::status(
        status.as_u16(),
        format!(
            "unexpected HTTP status code '{}' returned with reason '{reason}'",
            status.as_u16()
        ),
    ))
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::{ensure_expected, expected_status_codes, Strictness};
    use crate::Method;

    #[test]
    fn table_matches_method_semantics() {
        assert_eq!(Method::Get.expected_status_codes(), &[200]);
        assert_eq!(Method::Head.expected_status_codes(), &[200]);
        assert_eq!(Method::Post.expected_status_codes(), &[200, 201, 204]);
        assert_eq!(Method::Put.expected_status_codes(), &[200, 202, 204]);
        assert_eq!(Method::Delete.expected_status_codes(), &[200, 202, 204]);
        assert_eq!(Method::Patch.expected_status_codes(), &[200, 204]);
    }

    #[test]
    fn unknown_method_depends_on_strictness() {
        assert!(expected_status_codes("TRACE", Strictness::Reject).is_err());
        assert_eq!(
            expected_status_codes("TRACE", Strictness::Fallback).unwrap(),
            &[200]
        );
        assert_eq!(
            expected_status_codes("post", Strictness::Reject).unwrap(),
            &[200, 201, 204]
        );
    }

    #[test]
    fn unexpected_status_carries_code_and_reason() {
        let err = ensure_expected(StatusCode::NOT_FOUND, &[200]).unwrap_err();
        assert_eq!(err.http_status(), Some(404));
        let message = err.to_string();
        assert!(message.contains("'404'"), "{message}");
        assert!(message.contains("Not Found"), "{message}");
    }

    #[test]
    fn accepted_status_passes() {
        assert!(ensure_expected(StatusCode::ACCEPTED, &[200, 202, 204]).is_ok());
    }
}
