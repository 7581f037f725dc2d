use std::{fmt, sync::Arc};

use crate::{
    session::Session,
    status::ensure_expected,
    target::build_target,
    ApiRequest, AuthProvider, BasicAuth, BearerAuth, Call, ClientOptions, Method, NoAuth, Outcome,
    QueryParams, RawAuthorization, RequestsApiError, Result,
};

#[derive(Clone)]
/// HTTP client for one endpoint.
///
/// Configuration is fixed at construction and shared read-only between
/// clones, so one client can serve many concurrent calls. Each call opens its
/// own transport session.
pub struct RequestsApi {
    baseurl: String,
    auth: Arc<dyn AuthProvider>,
    options: ClientOptions,
}

impl fmt::Debug for RequestsApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestsApi")
            .field("baseurl", &self.baseurl)
            .field("auth", &"<redacted>")
            .field("options", &self.options)
            .finish()
    }
}

impl RequestsApi {
    /// Creates a client for `baseurl` (authority plus optional path prefix,
    /// without scheme) using `auth` for every request.
    pub fn new(baseurl: impl Into<String>, auth: impl AuthProvider + 'static) -> Self {
        Self {
            baseurl: baseurl.into(),
            auth: Arc::new(auth),
            options: ClientOptions::default(),
        }
    }

    /// Creates a client that sends no credentials.
    pub fn anonymous(baseurl: impl Into<String>) -> Self {
        Self::new(baseurl, NoAuth)
    }

    /// Creates a client using HTTP Basic authentication.
    pub fn new_basic(
        baseurl: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::new(baseurl, BasicAuth::new(username, password))
    }

    /// Creates a client from a bearer token.
    ///
    /// If the token is missing the `Bearer ` prefix, it is added automatically.
    pub fn new_bearer(baseurl: impl Into<String>, token: impl AsRef<str>) -> Self {
        Self::new(baseurl, BearerAuth::new(token))
    }

    /// Creates a client with a full raw authorization value.
    ///
    /// Example: `"Token <key>"` or any custom scheme.
    pub fn new_raw_auth(baseurl: impl Into<String>, authorization: impl Into<String>) -> Self {
        Self::new(baseurl, RawAuthorization::new(authorization))
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `REQUESTS_API_BASEURL`: host and optional path prefix
    ///   (e.g. `api.example.com/v1`)
    /// - `REQUESTS_API_TOKEN`: optional bearer token
    /// - `REQUESTS_API_SCHEME`: optional scheme, `https` when unset
    ///
    /// # Example
    ///
    /// ```no_run
    /// use requests_api::RequestsApi;
    ///
    /// let api = RequestsApi::from_env().expect("missing REQUESTS_API_BASEURL");
    /// ```
    pub fn from_env() -> Result<Self> {
        let baseurl = std::env::var("REQUESTS_API_BASEURL").map_err(|_| {
            RequestsApiError::config("missing REQUESTS_API_BASEURL environment variable")
        })?;
        if baseurl.trim().is_empty() {
            return Err(RequestsApiError::config(
                "REQUESTS_API_BASEURL is set but empty",
            ));
        }

        let client = match std::env::var("REQUESTS_API_TOKEN") {
            Ok(token) if !token.trim().is_empty() => Self::new_bearer(baseurl, token),
            _ => Self::anonymous(baseurl),
        };

        match std::env::var("REQUESTS_API_SCHEME") {
            Ok(scheme) if !scheme.trim().is_empty() => {
                let options = client.options.clone().with_scheme(scheme.trim());
                Ok(client.with_options(options))
            }
            _ => Ok(client),
        }
    }

    /// Applies client options such as headers, TLS mode and retry policy.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    pub fn baseurl(&self) -> &str {
        &self.baseurl
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Builds the full request target for `path` and `query`.
    pub fn encode_url(&self, path: &str, query: &QueryParams) -> Result<url::Url> {
        build_target(&self.options.scheme, &self.baseurl, path, query)
    }

    pub fn get(&self, path: impl Into<String>) -> Call<'_> {
        self.call(Method::Get, path)
    }

    pub fn head(&self, path: impl Into<String>) -> Call<'_> {
        self.call(Method::Head, path)
    }

    pub fn post(&self, path: impl Into<String>) -> Call<'_> {
        self.call(Method::Post, path)
    }

    pub fn put(&self, path: impl Into<String>) -> Call<'_> {
        self.call(Method::Put, path)
    }

    pub fn delete(&self, path: impl Into<String>) -> Call<'_> {
        self.call(Method::Delete, path)
    }

    pub fn patch(&self, path: impl Into<String>) -> Call<'_> {
        self.call(Method::Patch, path)
    }

    /// Starts a call for a method given by name.
    ///
    /// Unsupported methods fail when the call is sent, before any I/O.
    pub fn request(&self, method: &str, path: impl Into<String>) -> Call<'_> {
        let request = method
            .parse::<Method>()
            .map(|method| ApiRequest::new(method, path));
        Call::new(self, request)
    }

    fn call(&self, method: Method, path: impl Into<String>) -> Call<'_> {
        Call::new(self, Ok(ApiRequest::new(method, path)))
    }

    /// Executes a request descriptor.
    ///
    /// Opens a session with the retry policy mounted, sends the request,
    /// checks the status against the expected set and normalizes the body.
    pub async fn execute(&self, request: ApiRequest) -> Result<Outcome> {
        let url = self.encode_url(&request.path, &request.query)?;
        let body = request.body.as_ref().filter(|_| request.method.sends_body());

        #[cfg(feature = "tracing")]
        {
            if request.body.is_some() && body.is_none() {
                tracing::debug!(method = %request.method, "ignoring body for method without payload");
            }
        }

        let session = Session::open(&self.options, Arc::clone(&self.auth))?;
        let response = session.send(request.method, url, body).await;
        session.close();
        let response = response?;

        ensure_expected(response.status, request.expected_status_codes())?;
        Ok(crate::response::normalize(&response.body, &request.search_keys))
    }
}

#[cfg(test)]
mod tests {
    use super::RequestsApi;
    use crate::QueryParams;

    #[test]
    fn debug_redacts_authorization_value() {
        let client = RequestsApi::new_raw_auth("api.example.com", "secret-token");
        let debug = format!("{client:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn encode_url_uses_configured_scheme() {
        let client = RequestsApi::anonymous("localhost:3000/api").with_options(
            crate::ClientOptions::default().with_scheme("http"),
        );
        let url = client
            .encode_url("/users", &QueryParams::new().pair("page", 2))
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/users?page=2");
    }

    #[test]
    fn client_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<RequestsApi>();
    }
}
