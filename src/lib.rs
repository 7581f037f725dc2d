//! `requests-api` is an async HTTP request executor for REST endpoints.
//!
//! Every call goes through the same pipeline:
//! - the request target is built from the scheme, base URL, path and query
//! - a fresh session is opened with the endpoint's auth, TLS mode, headers
//!   and [`RetryPolicy`] mounted
//! - the response status is checked against the method's expected codes
//!   (or a per-call override)
//! - the body is normalized into an [`Outcome`], optionally reduced to the
//!   values of selected JSON keys
//!
//! ```no_run
//! use requests_api::{RequestsApi, Outcome};
//!
//! # async fn run() -> requests_api::Result<()> {
//! let api = RequestsApi::new_bearer("api.example.com/v1", "token");
//! let ids = api.get("/users").query([("active", true)]).search_keys(["id"]).send().await?;
//! if let Outcome::Document(ids) = ids {
//!     println!("{ids}");
//! }
//! # Ok(())
//! # }
//! ```

mod auth;
mod client;
mod error;
mod method;
mod options;
mod params;
mod request;
mod response;
mod retry;
mod session;
mod status;
mod target;

pub use auth::{AuthProvider, BasicAuth, BearerAuth, NoAuth, OAuth2Auth, RawAuthorization};
pub use client::RequestsApi;
pub use error::RequestsApiError;
pub use method::Method;
pub use options::{ClientOptions, TlsVerification};
pub use params::QueryParams;
pub use request::{ApiRequest, Call};
pub use response::{lookup, lookup_all, normalize, Outcome};
pub use retry::{AllowedMethods, RetryOverrides, RetryPolicy, BACKOFF_MAX};
pub use status::{expected_status_codes, Strictness};
pub use target::build_target;

pub type Result<T> = std::result::Result<T, RequestsApiError>;
