//! Request target construction.

use url::Url;

use crate::{QueryParams, RequestsApiError, Result};

/// Composes `scheme://baseurl/path?query`.
///
/// `baseurl` is an authority optionally followed by a path prefix
/// (`api.example.com/v2`). The request path is appended to that prefix.
/// Existing percent-escapes in `path` are kept, so feeding an already built
/// path back in yields the same target. A `?` in `path` starts an inline
/// query, which `query` is appended to.
pub fn build_target(scheme: &str, baseurl: &str, path: &str, query: &QueryParams) -> Result<Url> {
    let (path, inline_query) = match path.split_once('?') {
        Some((path, inline)) => (path, Some(inline).filter(|q| !q.is_empty())),
        None => (path, None),
    };

    let base = baseurl.trim().trim_end_matches('/');
    let mut url = Url::parse(&format!("{scheme}://{base}")).map_err(|err| {
        RequestsApiError::request(format!("invalid base URL '{scheme}://{base}': {err}"))
    })?;
    if url.cannot_be_a_base() {
        return Err(RequestsApiError::request(format!(
            "base URL '{scheme}://{base}' cannot carry a path"
        )));
    }

    let joined = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);

    url.set_query(inline_query);
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query.iter());
    }
    Ok(url)
}
