//! Per-call transport session with the retry policy mounted.

use std::{sync::Arc, time::Duration};

use reqwest::{
    header::{self, HeaderMap, HeaderName},
    redirect, StatusCode,
};
use serde_json::Value;
use tokio::time::sleep;
use url::Url;

use crate::{
    retry::{RetryCause, RetryState},
    AuthProvider, ClientOptions, Method, RequestsApiError, Result, RetryPolicy, TlsVerification,
};

/// Raw response handed to the status check and normalizer.
#[derive(Debug)]
pub(crate) struct RawResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// A transport configured for one call.
///
/// Dropping the session releases its connections.
pub(crate) struct Session<'a> {
    http: reqwest::Client,
    headers: &'a HeaderMap,
    auth: Arc<dyn AuthProvider>,
    policy: &'a RetryPolicy,
    allow_redirects: bool,
}

impl<'a> Session<'a> {
    pub(crate) fn open(options: &'a ClientOptions, auth: Arc<dyn AuthProvider>) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(Duration::from_millis(options.timeout_ms));

        builder = match &options.verify {
            TlsVerification::Verify => builder,
            TlsVerification::Skip => builder.danger_accept_invalid_certs(true),
            TlsVerification::CaBundle(path) => {
                let pem = std::fs::read(path).map_err(|err| {
                    RequestsApiError::request(format!(
                        "could not read CA bundle '{}': {err}",
                        path.display()
                    ))
                })?;
                let certs = reqwest::Certificate::from_pem_bundle(&pem)
                    .map_err(RequestsApiError::transport)?;
                certs
                    .into_iter()
                    .fold(builder.tls_built_in_root_certs(false), |b, cert| {
                        b.add_root_certificate(cert)
                    })
            }
        };

        let http = builder.build().map_err(RequestsApiError::transport)?;

        #[cfg(feature = "tracing")]
        tracing::trace!("session opened");

        Ok(Self {
            http,
            headers: &options.headers,
            auth,
            policy: &options.retry,
            allow_redirects: options.allow_redirects,
        })
    }

    /// Sends the request, retrying and following redirects as the policy
    /// allows.
    pub(crate) async fn send(
        &self,
        method: Method,
        target: Url,
        body: Option<&Value>,
    ) -> Result<RawResponse> {
        let mut state = RetryState::new(self.policy);
        let mut method = method;
        let mut body = body;
        let mut url = target.clone();

        loop {
            let cross_origin = url.origin() != target.origin();
            let request = self.build(method, &url, body, cross_origin)?;

            #[cfg(feature = "tracing")]
            tracing::debug!(%method, %url, "dispatching request");

            let response = match self.http.execute(request).await {
                Ok(response) => response,
                Err(err) => {
                    let cause = RetryCause::from_transport(&err);
                    match state.increment(cause, method) {
                        Some(delay) => {
                            #[cfg(feature = "tracing")]
                            tracing::debug!(?cause, ?delay, error = %err, "retrying after transport error");
                            sleep(delay).await;
                            continue;
                        }
                        None => {
                            #[cfg(feature = "tracing")]
                            tracing::warn!(?cause, error = %err, "retries exhausted");
                            return Err(RequestsApiError::transport(err));
                        }
                    }
                }
            };

            let status = response.status();

            if self.allow_redirects && status.is_redirection() {
                if let Some(next) = redirect_target(&url, response.headers()) {
                    if state.increment(RetryCause::Redirect, method).is_none() {
                        if self.policy.raise_on_redirect() {
                            return Err(RequestsApiError::status(
                                status.as_u16(),
                                format!("too many redirects, last hop to '{next}'"),
                            ));
                        }
                        return read(response).await;
                    }
                    if switches_to_get(status, method) {
                        method = Method::Get;
                        body = None;
                    }
                    #[cfg(feature = "tracing")]
                    tracing::debug!(%status, from = %url, to = %next, "following redirect");
                    url = next;
                    continue;
                }
            }

            let retry_after = retry_after(response.headers());
            if self.policy.is_retry(method, status, retry_after.is_some()) {
                match state.increment(RetryCause::Status, method) {
                    Some(backoff) => {
                        let delay = retry_after
                            .filter(|_| self.policy.respect_retry_after_header())
                            .unwrap_or(backoff);
                        #[cfg(feature = "tracing")]
                        tracing::debug!(%status, ?delay, "retrying after status");
                        drop(response);
                        sleep(delay).await;
                        continue;
                    }
                    None if self.policy.raise_on_status() => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(%status, "status retries exhausted");
                        return Err(RequestsApiError::status(
                            status.as_u16(),
                            format!(
                                "too many retries, last response status '{}' with reason '{}'",
                                status.as_u16(),
                                status.canonical_reason().unwrap_or("")
                            ),
                        ));
                    }
                    None => return read(response).await,
                }
            }

            return read(response).await;
        }
    }

    fn build(
        &self,
        method: Method,
        url: &Url,
        body: Option<&Value>,
        cross_origin: bool,
    ) -> Result<reqwest::Request> {
        let mut builder = self
            .http
            .request(method.to_reqwest(), url.clone())
            .headers(self.headers.clone());
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let mut request = self
            .auth
            .apply(builder)
            .build()
            .map_err(RequestsApiError::transport)?;

        if cross_origin {
            let stripped: Vec<HeaderName> = request
                .headers()
                .keys()
                .filter(|name| self.policy.strips_header(name.as_str()))
                .cloned()
                .collect();
            for name in stripped {
                request.headers_mut().remove(&name);
            }
        }
        Ok(request)
    }

    /// Releases the session.
    pub(crate) fn close(self) {}
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        #[cfg(feature = "tracing")]
        tracing::trace!("session closed");
    }
}

async fn read(response: reqwest::Response) -> Result<RawResponse> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(RequestsApiError::transport)?;
    Ok(RawResponse {
        status,
        body: body.to_vec(),
    })
}

fn redirect_target(current: &Url, headers: &HeaderMap) -> Option<Url> {
    let location = headers.get(header::LOCATION)?.to_str().ok()?;
    current.join(location.trim()).ok()
}

/// 303 always becomes GET; 301 and 302 do so for POST.
fn switches_to_get(status: StatusCode, method: Method) -> bool {
    match status {
        StatusCode::SEE_OTHER => method != Method::Head,
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND => method == Method::Post,
        _ => false,
    }
}

/// Delta-seconds value of a `Retry-After` header.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::{
        header::{HeaderMap, HeaderValue, LOCATION, RETRY_AFTER},
        StatusCode,
    };
    use url::Url;

    use super::{redirect_target, retry_after, switches_to_get};
    use crate::Method;

    #[test]
    fn parses_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static(" 3 "));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(3)));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn resolves_relative_locations() {
        let current = Url::parse("https://a.example/v1/items?page=2").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_static("/v2/items"));
        assert_eq!(
            redirect_target(&current, &headers).unwrap().as_str(),
            "https://a.example/v2/items"
        );

        headers.insert(LOCATION, HeaderValue::from_static("https://b.example/x"));
        assert_eq!(
            redirect_target(&current, &headers).unwrap().as_str(),
            "https://b.example/x"
        );
    }

    #[test]
    fn method_rewrites_follow_redirect_status() {
        assert!(switches_to_get(StatusCode::SEE_OTHER, Method::Put));
        assert!(!switches_to_get(StatusCode::SEE_OTHER, Method::Head));
        assert!(switches_to_get(StatusCode::FOUND, Method::Post));
        assert!(!switches_to_get(StatusCode::FOUND, Method::Put));
        assert!(!switches_to_get(StatusCode::TEMPORARY_REDIRECT, Method::Post));
    }
}
