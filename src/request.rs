use serde::Serialize;
use serde_json::Value;

use crate::{Method, Outcome, QueryParams, RequestsApi, RequestsApiError, Result};

/// Everything needed to execute one call.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path appended to the base URL.
    pub path: String,
    pub query: QueryParams,
    /// JSON body, sent for POST, PUT and PATCH only.
    pub body: Option<Value>,
    /// Accepted status codes; `None` uses the method's defaults.
    pub status_codes: Option<Vec<u16>>,
    /// Member names to extract from a JSON response.
    pub search_keys: Vec<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: QueryParams::default(),
            body: None,
            status_codes: None,
            search_keys: Vec::new(),
        }
    }

    pub fn query(mut self, query: impl Into<QueryParams>) -> Self {
        self.query = query.into();
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.status_codes = Some(codes.into_iter().collect());
        self
    }

    pub fn search_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Status codes this request accepts as success.
    pub fn expected_status_codes(&self) -> &[u16] {
        self.status_codes
            .as_deref()
            .unwrap_or_else(|| self.method.expected_status_codes())
    }
}

/// A pending call built from [`RequestsApi`]'s per-method helpers.
///
/// Errors raised while building (an unsupported method, a body that fails to
/// serialize) are reported by [`Call::send`] before any network I/O.
#[must_use = "a call does nothing until `send` is awaited"]
pub struct Call<'a> {
    client: &'a RequestsApi,
    request: Result<ApiRequest>,
}

impl<'a> Call<'a> {
    pub(crate) fn new(client: &'a RequestsApi, request: Result<ApiRequest>) -> Self {
        Self { client, request }
    }

    pub fn query(mut self, query: impl Into<QueryParams>) -> Self {
        self.request = self.request.map(|r| r.query(query));
        self
    }

    /// Serializes `body` as the JSON request body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        self.request = self.request.and_then(|r| {
            serde_json::to_value(body)
                .map(|value| r.body(value))
                .map_err(|err| {
                    RequestsApiError::request(format!("request body could not be serialized: {err}"))
                })
        });
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.request = self.request.map(|r| r.body(body));
        self
    }

    /// Overrides the accepted status codes for this call.
    pub fn status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.request = self.request.map(|r| r.status_codes(codes));
        self
    }

    pub fn search_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request = self.request.map(|r| r.search_keys(keys));
        self
    }

    /// Returns the request descriptor, or the error recorded while building.
    pub fn into_request(self) -> Result<ApiRequest> {
        self.request
    }

    pub async fn send(self) -> Result<Outcome> {
        let request = self.request?;
        self.client.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{ApiRequest, Method, RequestsApi};

    #[test]
    fn descriptor_defaults_to_method_table() {
        let request = ApiRequest::new(Method::Put, "/things/1");
        assert_eq!(request.expected_status_codes(), &[200, 202, 204]);

        let request = request.status_codes([200]);
        assert_eq!(request.expected_status_codes(), &[200]);
    }

    #[test]
    fn call_builders_fill_descriptor() {
        let client = RequestsApi::anonymous("api.example.com");
        let request = client
            .post("/users")
            .query([("dry_run", true)])
            .json(&json!({"name": "Kit"}))
            .search_keys(["id"])
            .status_codes([201])
            .into_request()
            .unwrap();

        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path, "/users");
        assert_eq!(request.query.iter().collect::<Vec<_>>(), vec![("dry_run", "true")]);
        assert_eq!(request.body, Some(json!({"name": "Kit"})));
        assert_eq!(request.search_keys, vec!["id".to_owned()]);
        assert_eq!(request.status_codes, Some(vec![201]));
    }

    #[test]
    fn unsupported_method_is_kept_until_send() {
        let client = RequestsApi::anonymous("api.example.com");
        let err = client
            .request("TRACE", "/")
            .query([("a", 1)])
            .into_request()
            .unwrap_err();
        assert!(err.to_string().contains("TRACE"));
    }
}
