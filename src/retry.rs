//! Retry policy mounted on every request session.
//!
//! Policies are built from a template ([`RetryPolicy::default`],
//! [`RetryPolicy::all_methods`], [`RetryPolicy::disabled`]) merged with
//! overrides. Templates are produced fresh on each call, so merging one
//! policy never affects another.

use std::{collections::BTreeSet, time::Duration};

use reqwest::StatusCode;
use serde::Deserialize;

use crate::{Method, RequestsApiError, Result};

/// Upper bound for a single backoff sleep.
pub const BACKOFF_MAX: Duration = Duration::from_secs(120);

/// Statuses for which a `Retry-After` header alone makes a response retryable.
const RETRY_AFTER_STATUSES: [u16; 3] = [413, 429, 503];

/// Rules governing automatic re-attempts of a request.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    total: Option<u32>,
    connect: Option<u32>,
    read: Option<u32>,
    redirect: Option<u32>,
    status: Option<u32>,
    other: Option<u32>,
    allowed_methods: Option<BTreeSet<Method>>,
    status_forcelist: BTreeSet<u16>,
    backoff_factor: f64,
    raise_on_redirect: bool,
    raise_on_status: bool,
    respect_retry_after_header: bool,
    remove_headers_on_redirect: BTreeSet<String>,
}

impl Default for RetryPolicy {
    /// Five retries for idempotent-ish methods on gateway and server errors,
    /// with a 0.1 s backoff factor.
    fn default() -> Self {
        Self {
            total: Some(5),
            connect: None,
            read: None,
            redirect: None,
            status: None,
            other: None,
            allowed_methods: Some(BTreeSet::from([
                Method::Delete,
                Method::Get,
                Method::Put,
                Method::Post,
            ])),
            status_forcelist: BTreeSet::from([500, 502, 503, 504]),
            backoff_factor: 0.1,
            raise_on_redirect: true,
            raise_on_status: true,
            respect_retry_after_header: true,
            remove_headers_on_redirect: BTreeSet::from(["authorization".to_owned()]),
        }
    }
}

/// Key/value overrides merged over a policy template.
///
/// Deserialization rejects unknown keys.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryOverrides {
    pub total: Option<u32>,
    pub connect: Option<u32>,
    pub read: Option<u32>,
    pub redirect: Option<u32>,
    pub status: Option<u32>,
    pub other: Option<u32>,
    pub allowed_methods: Option<AllowedMethods>,
    pub status_forcelist: Option<Vec<u16>>,
    pub backoff_factor: Option<f64>,
    pub raise_on_redirect: Option<bool>,
    pub raise_on_status: Option<bool>,
    pub respect_retry_after_header: Option<bool>,
    pub remove_headers_on_redirect: Option<Vec<String>>,
}

/// Value of the `allowed_methods` override.
///
/// A list restricts retries to those methods; `false` retries every method.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AllowedMethods {
    Any(bool),
    List(Vec<String>),
}

impl RetryPolicy {
    /// Builds a policy from the default template and JSON overrides.
    ///
    /// ```
    /// use requests_api::RetryPolicy;
    ///
    /// let policy = RetryPolicy::new(serde_json::json!({"total": 2})).unwrap();
    /// assert_eq!(policy.total(), Some(2));
    /// assert!(RetryPolicy::new(serde_json::json!({"bogus": 1})).is_err());
    /// ```
    pub fn new(overrides: serde_json::Value) -> Result<Self> {
        Self::default().with_overrides(overrides)
    }

    /// Retries every method, with a steeper backoff and without `504`.
    pub fn all_methods() -> Self {
        Self {
            allowed_methods: None,
            status_forcelist: BTreeSet::from([500, 502, 503]),
            backoff_factor: 2.0,
            ..Self::default()
        }
    }

    /// Never retries.
    pub fn disabled() -> Self {
        Self {
            total: Some(0),
            ..Self::default()
        }
    }

    /// Returns a copy of this policy with JSON overrides merged in.
    ///
    /// `null` and `{}` leave the policy unchanged. Unknown keys and invalid
    /// values are configuration errors.
    pub fn with_overrides(&self, overrides: serde_json::Value) -> Result<Self> {
        if overrides.is_null() {
            return Ok(self.clone());
        }
        let overrides: RetryOverrides = serde_json::from_value(overrides)
            .map_err(|err| RequestsApiError::config(format!("invalid retry configuration: {err}")))?;
        self.merge(overrides)
    }

    /// Returns a copy of this policy with typed overrides merged in.
    pub fn merge(&self, overrides: RetryOverrides) -> Result<Self> {
        let mut policy = self.clone();
        let RetryOverrides {
            total,
            connect,
            read,
            redirect,
            status,
            other,
            allowed_methods,
            status_forcelist,
            backoff_factor,
            raise_on_redirect,
            raise_on_status,
            respect_retry_after_header,
            remove_headers_on_redirect,
        } = overrides;

        for (slot, value) in [
            (&mut policy.total, total),
            (&mut policy.connect, connect),
            (&mut policy.read, read),
            (&mut policy.redirect, redirect),
            (&mut policy.status, status),
            (&mut policy.other, other),
        ] {
            if value.is_some() {
                *slot = value;
            }
        }

        if let Some(allowed) = allowed_methods {
            policy.allowed_methods = match allowed {
                AllowedMethods::Any(false) => None,
                AllowedMethods::Any(true) => {
                    return Err(RequestsApiError::config(
                        "allowed_methods must be a list of methods or false",
                    ))
                }
                AllowedMethods::List(names) => Some(
                    names
                        .iter()
                        .map(|name| {
                            name.parse::<Method>().map_err(|_| {
                                RequestsApiError::config(format!(
                                    "allowed_methods contains unsupported method '{name}'"
                                ))
                            })
                        })
                        .collect::<Result<_>>()?,
                ),
            };
        }

        if let Some(codes) = status_forcelist {
            if let Some(bad) = codes.iter().find(|code| !(100..=599).contains(*code)) {
                return Err(RequestsApiError::config(format!(
                    "status_forcelist contains invalid status code {bad}"
                )));
            }
            policy.status_forcelist = codes.into_iter().collect();
        }

        if let Some(factor) = backoff_factor {
            if !factor.is_finite() || factor < 0.0 {
                return Err(RequestsApiError::config(format!(
                    "backoff_factor must be a non-negative number, got {factor}"
                )));
            }
            policy.backoff_factor = factor;
        }

        if let Some(value) = raise_on_redirect {
            policy.raise_on_redirect = value;
        }
        if let Some(value) = raise_on_status {
            policy.raise_on_status = value;
        }
        if let Some(value) = respect_retry_after_header {
            policy.respect_retry_after_header = value;
        }
        if let Some(headers) = remove_headers_on_redirect {
            policy.remove_headers_on_redirect =
                headers.iter().map(|h| h.trim().to_ascii_lowercase()).collect();
        }

        Ok(policy)
    }

    pub fn with_total(mut self, total: u32) -> Self {
        self.total = Some(total);
        self
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor.max(0.0);
        self
    }

    pub fn with_status_forcelist(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.status_forcelist = codes.into_iter().collect();
        self
    }

    /// Restricts read and status retries to `methods`.
    pub fn with_allowed_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.allowed_methods = Some(methods.into_iter().collect());
        self
    }

    pub fn with_raise_on_status(mut self, raise: bool) -> Self {
        self.raise_on_status = raise;
        self
    }

    pub fn with_raise_on_redirect(mut self, raise: bool) -> Self {
        self.raise_on_redirect = raise;
        self
    }

    pub fn with_respect_retry_after_header(mut self, respect: bool) -> Self {
        self.respect_retry_after_header = respect;
        self
    }

    pub fn with_remove_headers_on_redirect<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.remove_headers_on_redirect = headers
            .into_iter()
            .map(|h| h.as_ref().trim().to_ascii_lowercase())
            .collect();
        self
    }

    pub fn total(&self) -> Option<u32> {
        self.total
    }

    pub fn backoff_factor(&self) -> f64 {
        self.backoff_factor
    }

    pub fn status_forcelist(&self) -> &BTreeSet<u16> {
        &self.status_forcelist
    }

    /// `None` means every method is retryable.
    pub fn allowed_methods(&self) -> Option<&BTreeSet<Method>> {
        self.allowed_methods.as_ref()
    }

    pub fn raise_on_status(&self) -> bool {
        self.raise_on_status
    }

    pub fn raise_on_redirect(&self) -> bool {
        self.raise_on_redirect
    }

    pub fn respect_retry_after_header(&self) -> bool {
        self.respect_retry_after_header
    }

    /// Lower-cased header names stripped on cross-origin redirects.
    pub fn remove_headers_on_redirect(&self) -> &BTreeSet<String> {
        &self.remove_headers_on_redirect
    }

    /// Whether `name` is stripped on cross-origin redirects.
    pub fn strips_header(&self, name: &str) -> bool {
        self.remove_headers_on_redirect
            .iter()
            .any(|h| h.eq_ignore_ascii_case(name))
    }

    pub fn is_method_retryable(&self, method: Method) -> bool {
        self.allowed_methods
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&method))
    }

    /// Whether a response with `status` should be retried.
    pub fn is_retry(&self, method: Method, status: StatusCode, has_retry_after: bool) -> bool {
        if !self.is_method_retryable(method) {
            return false;
        }
        if self.status_forcelist.contains(&status.as_u16()) {
            return true;
        }
        self.total.map_or(true, |total| total > 0)
            && self.respect_retry_after_header
            && has_retry_after
            && RETRY_AFTER_STATUSES.contains(&status.as_u16())
    }

    /// Sleep before the retry following `consecutive_errors` failed attempts.
    ///
    /// The first retry is immediate, then `backoff_factor * 2^(n-1)` seconds
    /// capped at [`BACKOFF_MAX`].
    pub fn backoff(&self, consecutive_errors: u32) -> Duration {
        if consecutive_errors <= 1 {
            return Duration::ZERO;
        }
        let exp = (consecutive_errors - 1).min(32) as i32;
        let secs = self.backoff_factor * 2f64.powi(exp);
        if !secs.is_finite() || secs >= BACKOFF_MAX.as_secs_f64() {
            return BACKOFF_MAX;
        }
        Duration::from_secs_f64(secs.max(0.0))
    }
}

/// Why an attempt is being retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RetryCause {
    Connect,
    Read,
    Redirect,
    Status,
    Other,
}

impl RetryCause {
    pub(crate) fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_connect() {
            Self::Connect
        } else if err.is_timeout() || err.is_body() || err.is_decode() {
            Self::Read
        } else {
            Self::Other
        }
    }
}

/// Remaining budgets for one request.
#[derive(Debug)]
pub(crate) struct RetryState<'a> {
    policy: &'a RetryPolicy,
    total: Option<i64>,
    connect: Option<i64>,
    read: Option<i64>,
    redirect: Option<i64>,
    status: Option<i64>,
    other: Option<i64>,
    consecutive_errors: u32,
}

impl<'a> RetryState<'a> {
    pub(crate) fn new(policy: &'a RetryPolicy) -> Self {
        let budget = |value: Option<u32>| value.map(i64::from);
        Self {
            policy,
            total: budget(policy.total),
            connect: budget(policy.connect),
            read: budget(policy.read),
            redirect: budget(policy.redirect),
            status: budget(policy.status),
            other: budget(policy.other),
            consecutive_errors: 0,
        }
    }

    /// Records a retry. Returns the backoff to sleep, or `None` once the
    /// policy is exhausted.
    pub(crate) fn increment(&mut self, cause: RetryCause, method: Method) -> Option<Duration> {
        if cause == RetryCause::Read && !self.policy.is_method_retryable(method) {
            return None;
        }

        decrement(&mut self.total);
        let slot = match cause {
            RetryCause::Connect => &mut self.connect,
            RetryCause::Read => &mut self.read,
            RetryCause::Redirect => &mut self.redirect,
            RetryCause::Status => &mut self.status,
            RetryCause::Other => &mut self.other,
        };
        decrement(slot);

        if cause != RetryCause::Redirect {
            self.consecutive_errors += 1;
        }

        if self.is_exhausted() {
            return None;
        }
        if cause == RetryCause::Redirect {
            return Some(Duration::ZERO);
        }
        Some(self.policy.backoff(self.consecutive_errors))
    }

    fn is_exhausted(&self) -> bool {
        [
            self.total,
            self.connect,
            self.read,
            self.redirect,
            self.status,
            self.other,
        ]
        .into_iter()
        .flatten()
        .any(|left| left < 0)
    }
}

fn decrement(slot: &mut Option<i64>) {
    if let Some(left) = slot {
        *left -= 1;
    }
}
