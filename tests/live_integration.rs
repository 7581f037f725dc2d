//! Runs against an httpbin-compatible service when
//! `REQUESTS_API_LIVE_BASEURL` is set (for example `httpbin.org`).

use requests_api::{ClientOptions, Outcome, RequestsApi, RetryPolicy};
use serde_json::json;

fn load_live_client() -> Result<RequestsApi, String> {
    let baseurl = std::env::var("REQUESTS_API_LIVE_BASEURL")
        .map_err(|_| "REQUESTS_API_LIVE_BASEURL is required".to_owned())?;
    let scheme = std::env::var("REQUESTS_API_LIVE_SCHEME").unwrap_or_else(|_| "https".to_owned());

    Ok(RequestsApi::new_basic(baseurl, "live-user", "live-pass").with_options(
        ClientOptions::default()
            .with_scheme(scheme)
            .with_timeout_ms(15_000)
            .with_retry(RetryPolicy::default().with_total(2)),
    ))
}

#[tokio::test]
async fn live_roundtrip_against_httpbin() {
    let api = match load_live_client() {
        Ok(api) => api,
        Err(_) => {
            eprintln!("skipping live test: REQUESTS_API_LIVE_BASEURL not set");
            return;
        }
    };

    let args = api
        .get("/get")
        .query([("probe", "requests api")])
        .search_keys(["probe"])
        .send()
        .await
        .expect("get must succeed");
    assert_eq!(args, Outcome::Document(json!(["requests api"])));

    let echoed = api
        .post("/post")
        .json(&json!({"name": "Kit"}))
        .search_keys(["json"])
        .send()
        .await
        .expect("post must succeed");
    assert_eq!(echoed, Outcome::Document(json!([{"name": "Kit"}])));

    let authed = api
        .get("/basic-auth/live-user/live-pass")
        .search_keys(["authenticated"])
        .send()
        .await
        .expect("basic auth must be accepted");
    assert_eq!(authed, Outcome::Document(json!([true])));

    let err = api
        .get("/status/404")
        .send()
        .await
        .expect_err("404 must fail");
    assert_eq!(err.http_status(), Some(404));

    let deleted = api
        .delete("/status/204")
        .send()
        .await
        .expect("204 is a default DELETE success");
    assert!(deleted.is_no_content());
}
