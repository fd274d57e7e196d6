mod common;

use anyhow::Result;
use asm_api::types::Role;
use reqwest::StatusCode;
use serde_json::{json, Value};

fn header<'a>(res: &'a reqwest::Response, name: &str) -> Option<&'a str> {
    res.headers().get(name).and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn sixth_login_attempt_is_throttled() -> Result<()> {
    let mut config = common::test_config();
    config.rate_limit.auth.max_requests = 5;
    let server = common::spawn_with(config).await?;
    let payload = json!({ "email": "nobody@example.com", "password": "Wrong1234" });

    for attempt in 1..=5u32 {
        let res = server.client.post(server.url("/api/auth/login")).json(&payload).send().await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "attempt {attempt}");
        assert_eq!(header(&res, "ratelimit-limit"), Some("5"));
        assert_eq!(header(&res, "ratelimit-remaining"), Some((5 - attempt).to_string().as_str()));
    }

    let res = server.client.post(server.url("/api/auth/login")).json(&payload).send().await?;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header(&res, "ratelimit-remaining"), Some("0"));
    assert_eq!(header(&res, "ratelimit-policy"), Some("5;w=900"));
    let retry_after: u64 = header(&res, "retry-after").unwrap_or_default().parse()?;
    assert!(retry_after > 0 && retry_after <= 900);

    let body: Value = res.json().await?;
    assert_eq!(
        body["error"],
        "Too many authentication attempts, please try again after 15 minutes"
    );
    Ok(())
}

#[tokio::test]
async fn throttled_requests_never_reach_validation() -> Result<()> {
    let mut config = common::test_config();
    config.rate_limit.auth.max_requests = 1;
    let server = common::spawn_with(config).await?;

    let res = server.client.post(server.url("/api/auth/register")).json(&json!({})).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Register and login share the strict quota
    let res = server.client.post(server.url("/api/auth/login")).json(&json!({})).send().await?;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    Ok(())
}

#[tokio::test]
async fn write_quota_is_separate_from_reads() -> Result<()> {
    let mut config = common::test_config();
    config.rate_limit.write.max_requests = 2;
    let server = common::spawn_with(config).await?;
    let (_, token) = server.signed_in("worker@example.com", Role::Worker).await?;

    // Forbidden writes still spend the quota; the limiter runs first
    for _ in 0..2 {
        let res = server
            .client
            .post(server.url("/api/sites"))
            .bearer_auth(&token)
            .json(&json!({}))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
    let res = server
        .client
        .post(server.url("/api/sites"))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

    let res = server.client.get(server.url("/api/sites")).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn disabled_limiter_sets_no_headers() -> Result<()> {
    let mut config = common::test_config();
    config.rate_limit.enabled = false;
    config.rate_limit.auth.max_requests = 1;
    let server = common::spawn_with(config).await?;

    for _ in 0..3 {
        let res = server.client.post(server.url("/api/auth/login")).json(&json!({})).send().await?;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(header(&res, "ratelimit-limit").is_none());
    }
    Ok(())
}
