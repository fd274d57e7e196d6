//! Process-scoped state and the HTTP router.
//!
//! Each route carries a [`RoutePolicy`] that decides which gates wrap its
//! handler. Gates run in a fixed order: rate limit, then bearer token, then
//! role allow-list. Body and query validation happen in the handler's
//! extractors, after every gate has passed.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Json},
    routing::{delete, get, post, put, MethodRouter},
    Router,
};
use parking_lot::Mutex;
use serde_json::json;
use tokio::task::JoinHandle;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{password::PasswordHasher, TokenService};
use crate::config::{AppConfig, StorageBackend};
use crate::database::{DatabaseManager, MemoryStore, PgStore, Store};
use crate::error::ApiError;
use crate::handlers::{protected, public};
use crate::middleware::{authenticate, authorize, expose_internal_errors, throttle, RateClass, RateGate, RateLimiter, RoleGate};
use crate::storage::{LocalObjectStore, MemoryObjectStore, ObjectStore};
use crate::types::Role;

/// Multipart framing allowance on top of the file size limit
const UPLOAD_FORM_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub objects: Arc<dyn ObjectStore>,
    pub tokens: Arc<TokenService>,
    pub passwords: PasswordHasher,
    pub limiter: RateLimiter,
    sweeper: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl AppState {
    /// Fails when the signing secret or bcrypt cost is unusable
    pub fn new(config: AppConfig, store: Arc<dyn Store>, objects: Arc<dyn ObjectStore>) -> anyhow::Result<Self> {
        let tokens = TokenService::new(&config.security.jwt_secret, config.security.jwt_expiry)?;
        let passwords = PasswordHasher::new(config.security.bcrypt_cost)?;
        let limiter = RateLimiter::new(config.rate_limit.clone());

        Ok(Self {
            config: Arc::new(config),
            store,
            objects,
            tokens: Arc::new(tokens),
            passwords,
            limiter,
            sweeper: Arc::new(Mutex::new(None)),
        })
    }

    /// Build the configured store backends. Postgres connects the pool and
    /// applies migrations when enabled.
    pub async fn connect(config: AppConfig) -> anyhow::Result<Self> {
        let (store, objects): (Arc<dyn Store>, Arc<dyn ObjectStore>) = match config.storage.backend {
            StorageBackend::Postgres => {
                let db = DatabaseManager::connect(&config.database)
                    .await
                    .context("failed to connect to the database")?;
                if config.database.run_migrations {
                    db.migrate().await.context("failed to apply migrations")?;
                }
                (
                    Arc::new(PgStore::new(db)),
                    Arc::new(LocalObjectStore::new(config.storage.upload_dir.clone())),
                )
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                (Arc::new(MemoryStore::new()), Arc::new(MemoryObjectStore::new()))
            }
        };

        Self::new(config, store, objects)
    }

    /// Start evicting idle rate-limit counters in the background
    pub fn start_sweeper(&self) {
        let mut sweeper = self.sweeper.lock();
        if sweeper.is_none() {
            *sweeper = Some(self.limiter.spawn_sweeper());
        }
    }

    /// Stop the counter sweeper and close the store
    pub async fn shutdown(&self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
        self.store.close().await;
        tracing::info!("Application state shut down");
    }
}

/// Gates applied to one route
#[derive(Debug, Clone, Copy)]
pub struct RoutePolicy {
    pub authenticated: bool,
    pub roles: Option<&'static [Role]>,
    pub class: RateClass,
}

const ADMIN_MANAGER: &[Role] = &[Role::Admin, Role::Manager];
const ADMIN_ONLY: &[Role] = &[Role::Admin];

impl RoutePolicy {
    pub const CREDENTIALS: Self = Self::public(RateClass::Strict);
    pub const READ: Self = Self::signed_in(RateClass::General);
    pub const WRITE: Self = Self::signed_in(RateClass::Write);
    pub const MANAGE: Self = Self::restricted(ADMIN_MANAGER, RateClass::Write);
    pub const ADMINISTER: Self = Self::restricted(ADMIN_ONLY, RateClass::Write);

    pub const fn public(class: RateClass) -> Self {
        Self {
            authenticated: false,
            roles: None,
            class,
        }
    }

    pub const fn signed_in(class: RateClass) -> Self {
        Self {
            authenticated: true,
            roles: None,
            class,
        }
    }

    pub const fn restricted(roles: &'static [Role], class: RateClass) -> Self {
        Self {
            authenticated: true,
            roles: Some(roles),
            class,
        }
    }
}

/// Wrap `route` in the gates its policy asks for. Later layers run first,
/// so the rate limiter is added last.
fn guard(state: &AppState, policy: RoutePolicy, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    let mut route = route;
    if let Some(roles) = policy.roles {
        route = route.layer(from_fn_with_state(RoleGate::new(roles), authorize));
    }
    if policy.authenticated {
        route = route.layer(from_fn_with_state(state.tokens.clone(), authenticate));
    }
    route.layer(from_fn_with_state(
        RateGate {
            limiter: state.limiter.clone(),
            class: policy.class,
        },
        throttle,
    ))
}

pub fn router(state: AppState) -> Router {
    use protected::{checklists, dashboard, documents, operations, sites};

    let s = &state;
    let upload_limit = DefaultBodyLimit::max(state.config.storage.max_upload_bytes + UPLOAD_FORM_OVERHEAD);

    let mut app = Router::new()
        // Public
        .route("/health", get(health))
        .route("/api", get(banner))
        .route("/api/auth/register", guard(s, RoutePolicy::CREDENTIALS, post(public::auth::register_post)))
        .route("/api/auth/login", guard(s, RoutePolicy::CREDENTIALS, post(public::auth::login_post)))
        // Protected
        .route("/api/auth/profile", guard(s, RoutePolicy::READ, get(protected::auth::profile_get)))
        .route(
            "/api/sites",
            guard(s, RoutePolicy::READ, get(sites::sites_list))
                .merge(guard(s, RoutePolicy::MANAGE, post(sites::site_create))),
        )
        .route("/api/sites/manager/:managerId", guard(s, RoutePolicy::READ, get(sites::sites_by_manager)))
        .route(
            "/api/sites/:id",
            guard(s, RoutePolicy::READ, get(sites::site_get))
                .merge(guard(s, RoutePolicy::MANAGE, put(sites::site_update)))
                .merge(guard(s, RoutePolicy::ADMINISTER, delete(sites::site_delete))),
        )
        .route("/api/operations", guard(s, RoutePolicy::WRITE, post(operations::operation_create)))
        .route(
            "/api/operations/site/:siteId",
            guard(s, RoutePolicy::READ, get(operations::operations_by_site)),
        )
        .route(
            "/api/operations/:id",
            guard(s, RoutePolicy::READ, get(operations::operation_get))
                .merge(guard(s, RoutePolicy::WRITE, put(operations::operation_update)))
                .merge(guard(s, RoutePolicy::MANAGE, delete(operations::operation_delete))),
        )
        .route(
            "/api/documents",
            guard(s, RoutePolicy::READ, get(documents::documents_list)).merge(guard(
                s,
                RoutePolicy::WRITE,
                post(documents::document_upload).layer(upload_limit),
            )),
        )
        .route(
            "/api/documents/:id",
            guard(s, RoutePolicy::READ, get(documents::document_get))
                .merge(guard(s, RoutePolicy::WRITE, put(documents::document_update)))
                .merge(guard(s, RoutePolicy::MANAGE, delete(documents::document_delete))),
        )
        .route(
            "/api/documents/:id/download",
            guard(s, RoutePolicy::READ, get(documents::document_download)),
        )
        .route("/api/checklists", guard(s, RoutePolicy::READ, get(checklists::checklists_list)))
        .route("/api/dashboard/stats", guard(s, RoutePolicy::READ, get(dashboard::stats_get)))
        .fallback(not_found);

    if state.config.is_development() {
        app = app.layer(from_fn(expose_internal_errors));
    }

    app = app.layer(cors_layer(&state.config.server.cors_origins));
    if state.config.server.enable_request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }
    app.with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(parsed)
}

async fn banner() -> Json<serde_json::Value> {
    Json(json!({
        "message": "ASM API v1.0",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "API is running",
                "timestamp": now,
                "database": "ok",
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable",
                })),
            )
        }
    }
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
