//! Credential providers.
//!
//! An [`AuthProvider`] decorates each outgoing request. Challenge/response
//! schemes (Digest, NTLM, Kerberos) plug in by implementing the trait.

use std::fmt;

use reqwest::{header, RequestBuilder};

use crate::{RequestsApiError, Result};

/// Capability to attach credentials to an outgoing request.
pub trait AuthProvider: Send + Sync {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder;
}

impl<F> AuthProvider for F
where
    F: Fn(RequestBuilder) -> RequestBuilder + Send + Sync,
{
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        self(request)
    }
}

/// Sends requests without credentials.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAuth;

impl AuthProvider for NoAuth {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        request
    }
}

/// HTTP Basic authentication.
#[derive(Clone)]
pub struct BasicAuth {
    username: String,
    password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl AuthProvider for BasicAuth {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.username, Some(&self.password))
    }
}

/// Bearer token authentication.
///
/// The `Bearer ` prefix is added when missing.
#[derive(Clone)]
pub struct BearerAuth {
    authorization: String,
}

impl BearerAuth {
    pub fn new(token: impl AsRef<str>) -> Self {
        Self {
            authorization: normalize_bearer_authorization(token.as_ref()),
        }
    }
}

impl fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuth")
            .field("authorization", &"<redacted>")
            .finish()
    }
}

impl AuthProvider for BearerAuth {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(header::AUTHORIZATION, &self.authorization)
    }
}

/// Sends a fixed `Authorization` value verbatim, for custom schemes.
#[derive(Clone)]
pub struct RawAuthorization(String);

impl RawAuthorization {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Debug for RawAuthorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawAuthorization(<redacted>)")
    }
}

impl AuthProvider for RawAuthorization {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(header::AUTHORIZATION, &self.0)
    }
}

/// OAuth2 bearer credentials from an already issued token.
///
/// Token acquisition and refresh are left to the caller.
#[derive(Clone)]
pub struct OAuth2Auth {
    client_id: String,
    bearer: BearerAuth,
}

impl OAuth2Auth {
    /// Builds credentials from an OAuth2 token response.
    ///
    /// The token must contain `access_token`; `token_type`, when present,
    /// must be `bearer` (any case).
    pub fn from_token(client_id: impl Into<String>, token: &serde_json::Value) -> Result<Self> {
        let access_token = token
            .get("access_token")
            .and_then(serde_json::Value::as_str)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| RequestsApiError::config("OAuth2 token is missing access_token"))?;

        if let Some(kind) = token.get("token_type") {
            let kind = kind.as_str().unwrap_or_default();
            if !kind.eq_ignore_ascii_case("bearer") {
                return Err(RequestsApiError::config(format!(
                    "unsupported OAuth2 token_type '{kind}'"
                )));
            }
        }

        Ok(Self {
            client_id: client_id.into(),
            bearer: BearerAuth::new(access_token),
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

impl fmt::Debug for OAuth2Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Auth")
            .field("client_id", &self.client_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl AuthProvider for OAuth2Auth {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        self.bearer.apply(request)
    }
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::AUTHORIZATION;
    use serde_json::json;

    use super::{
        normalize_bearer_authorization, AuthProvider, BasicAuth, BearerAuth, NoAuth, OAuth2Auth,
        RawAuthorization,
    };

    fn authorization(provider: &dyn AuthProvider) -> Option<String> {
        let request = provider
            .apply(reqwest::Client::new().get("http://localhost/"))
            .build()
            .unwrap();
        request
            .headers()
            .get(AUTHORIZATION)
            .map(|value| value.to_str().unwrap().to_owned())
    }

    #[test]
    fn normalize_bearer_adds_prefix_when_missing() {
        assert_eq!(normalize_bearer_authorization("abc123"), "Bearer abc123");
    }

    #[test]
    fn normalize_bearer_keeps_existing_prefix() {
        assert_eq!(
            normalize_bearer_authorization("bEaReR abc123"),
            "bEaReR abc123"
        );
    }

    #[test]
    fn providers_set_authorization_header() {
        assert_eq!(authorization(&NoAuth), None);
        assert_eq!(
            authorization(&BasicAuth::new("user", "pass")).as_deref(),
            Some("Basic dXNlcjpwYXNz")
        );
        assert_eq!(
            authorization(&BearerAuth::new("t0k")).as_deref(),
            Some("Bearer t0k")
        );
        assert_eq!(
            authorization(&RawAuthorization::new("Token xyz")).as_deref(),
            Some("Token xyz")
        );
    }

    #[test]
    fn closures_are_providers() {
        let provider = |request: reqwest::RequestBuilder| request.header(AUTHORIZATION, "Custom 1");
        assert_eq!(authorization(&provider).as_deref(), Some("Custom 1"));
    }

    #[test]
    fn oauth2_requires_bearer_access_token() {
        let auth = OAuth2Auth::from_token(
            "client",
            &json!({"access_token": "abc", "token_type": "Bearer"}),
        )
        .unwrap();
        assert_eq!(auth.client_id(), "client");
        assert_eq!(authorization(&auth).as_deref(), Some("Bearer abc"));

        assert!(OAuth2Auth::from_token("client", &json!({"token_type": "Bearer"})).is_err());
        assert!(OAuth2Auth::from_token(
            "client",
            &json!({"access_token": "abc", "token_type": "mac"})
        )
        .is_err());
    }

    #[test]
    fn debug_redacts_secrets() {
        let debug = format!(
            "{:?} {:?} {:?}",
            BasicAuth::new("user", "hunter2"),
            BearerAuth::new("secret-token"),
            RawAuthorization::new("secret-raw"),
        );
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("secret-token"));
        assert!(!debug.contains("secret-raw"));
    }
}
