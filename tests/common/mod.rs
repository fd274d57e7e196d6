#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use asm_api::app::{router, AppState};
use asm_api::config::{AppConfig, StorageBackend};
use asm_api::database::models::{NewUser, User};
use asm_api::database::MemoryStore;
use asm_api::storage::MemoryObjectStore;
use asm_api::types::Role;

pub const TEST_SECRET: &str = "integration-test-signing-secret";
pub const PASSWORD: &str = "Sup3rSecret";

/// One in-process server backed by the memory store. Dropped with the test.
pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    pub objects: Arc<MemoryObjectStore>,
    pub client: reqwest::Client,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Test defaults: cheap bcrypt, a real secret and quotas high enough to stay out of the way
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.storage.backend = StorageBackend::Memory;
    config.security.jwt_secret = TEST_SECRET.to_string();
    config.security.bcrypt_cost = 4;
    config.server.enable_request_logging = false;
    config.rate_limit.auth.max_requests = 1_000;
    config.rate_limit.api.max_requests = 1_000;
    config.rate_limit.write.max_requests = 1_000;
    config
}

pub async fn spawn() -> Result<TestServer> {
    spawn_with(test_config()).await
}

pub async fn spawn_with(config: AppConfig) -> Result<TestServer> {
    let objects = Arc::new(MemoryObjectStore::new());
    let state = AppState::new(config, Arc::new(MemoryStore::new()), objects.clone())?;

    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let app = router(state.clone());
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await;
    });

    let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;

    Ok(TestServer {
        base_url: format!("http://{}", addr),
        state,
        objects,
        client,
        handle,
    })
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Insert a user directly, bypassing the WORKER-only registration route
    pub async fn seed_user(&self, email: &str, role: Role) -> Result<User> {
        let password_hash = self.state.passwords.hash(PASSWORD.to_string()).await?;
        let user = self
            .state
            .store
            .create_user(NewUser {
                email: email.to_string(),
                password_hash,
                first_name: "Test".to_string(),
                last_name: role.as_str().to_string(),
                role,
            })
            .await?;
        Ok(user)
    }

    pub fn token_for(&self, user: &User) -> Result<String> {
        Ok(self.state.tokens.issue(&user.identity())?.token)
    }

    /// Seed a user with `role` and return it with a bearer token
    pub async fn signed_in(&self, email: &str, role: Role) -> Result<(User, String)> {
        let user = self.seed_user(email, role).await?;
        let token = self.token_for(&user)?;
        Ok((user, token))
    }

    /// Create a site through the API and return its JSON
    pub async fn create_site(&self, token: &str, manager: &User, name: &str) -> Result<Value> {
        let res = self
            .client
            .post(self.url("/api/sites"))
            .bearer_auth(token)
            .json(&site_payload(manager, name))
            .send()
            .await?;
        anyhow::ensure!(res.status() == reqwest::StatusCode::CREATED, "site create returned {}", res.status());
        Ok(res.json().await?)
    }
}

pub fn site_payload(manager: &User, name: &str) -> Value {
    json!({
        "name": name,
        "location": "Leeds",
        "address": "1 Example Street",
        "postcode": "LS1 1AA",
        "startDate": "2024-03-01T08:00:00Z",
        "status": "ACTIVE",
        "managerId": manager.id,
    })
}

/// Field names reported in a 400 validation body
pub fn error_fields(body: &Value) -> Vec<String> {
    body["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e["field"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
