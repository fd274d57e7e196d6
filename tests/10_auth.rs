mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::spawn().await?;

    let res = server.client.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    assert_eq!(body["status"], "API is running");
    assert_eq!(body["database"], "ok");
    assert!(body["timestamp"].is_string());
    Ok(())
}

#[tokio::test]
async fn api_banner_and_unknown_routes() -> Result<()> {
    let server = common::spawn().await?;

    let body: Value = server.client.get(server.url("/api")).send().await?.json().await?;
    assert_eq!(body["message"], "ASM API v1.0");

    let res = server.client.get(server.url("/api/nope")).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn register_creates_worker_and_returns_token() -> Result<()> {
    let server = common::spawn().await?;

    let res = server
        .client
        .post(server.url("/api/auth/register"))
        .json(&json!({
            "email": "  New.Worker@Example.com ",
            "password": "Str0ngPass",
            "firstName": "New",
            "lastName": "Worker",
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let body: Value = res.json().await?;
    assert_eq!(body["user"]["email"], "new.worker@example.com");
    assert_eq!(body["user"]["role"], "WORKER");
    assert!(body["user"].get("passwordHash").is_none());
    let token = body["token"].as_str().unwrap_or_default();
    assert!(!token.is_empty());

    // The token works against a protected route
    let profile: Value = server
        .client
        .get(server.url("/api/auth/profile"))
        .bearer_auth(token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(profile["email"], "new.worker@example.com");
    assert_eq!(profile["firstName"], "New");
    Ok(())
}

#[tokio::test]
async fn register_rejects_duplicate_email() -> Result<()> {
    let server = common::spawn().await?;
    let payload = json!({
        "email": "dup@example.com",
        "password": "Str0ngPass",
        "firstName": "Dup",
        "lastName": "User",
    });

    let first = server.client.post(server.url("/api/auth/register")).json(&payload).send().await?;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = server.client.post(server.url("/api/auth/register")).json(&payload).send().await?;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body: Value = second.json().await?;
    assert_eq!(body["error"], "User already exists");
    Ok(())
}

#[tokio::test]
async fn register_reports_every_invalid_field() -> Result<()> {
    let server = common::spawn().await?;

    let res = server
        .client
        .post(server.url("/api/auth/register"))
        .json(&json!({ "email": "not-an-email", "password": "short" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = res.json().await?;
    let fields = common::error_fields(&body);
    for expected in ["email", "password", "firstName", "lastName"] {
        assert!(fields.iter().any(|f| f == expected), "missing error for {expected}: {body}");
    }
    Ok(())
}

#[tokio::test]
async fn profile_requires_a_valid_token() -> Result<()> {
    let server = common::spawn().await?;

    let res = server.client.get(server.url("/api/auth/profile")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "No token provided");

    let res = server
        .client
        .get(server.url("/api/auth/profile"))
        .bearer_auth("not.a.jwt")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "Invalid token");
    Ok(())
}

#[tokio::test]
async fn profile_of_deleted_user_is_not_found() -> Result<()> {
    let server = common::spawn().await?;

    // Token for a user id the store has never seen
    let ghost = asm_api::middleware::AuthUser {
        id: uuid::Uuid::new_v4(),
        email: "ghost@example.com".to_string(),
        role: asm_api::types::Role::Worker,
    };
    let token = server.state.tokens.issue(&ghost)?.token;

    let res = server
        .client
        .get(server.url("/api/auth/profile"))
        .bearer_auth(token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}
