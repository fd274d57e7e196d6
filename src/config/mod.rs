use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Signing secrets that ship in sample files and must never reach a running server
pub const INSECURE_SECRETS: &[&str] = &["secret", "your_jwt_secret", "changeme", "change-me", "jwt_secret"];

/// Work factors bcrypt accepts
const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("JWT_SECRET must be changed from the default value for security")]
    InsecureSecret,

    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub rate_limit: RateLimitConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// `["*"]` means any origin
    pub cors_origins: Vec<String>,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

/// Quota for a single route class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatePolicy {
    pub max_requests: u32,
    pub window: Duration,
    pub message: String,
}

impl RatePolicy {
    pub fn new(max_requests: u32, window: Duration, message: impl Into<String>) -> Self {
        Self {
            max_requests,
            window,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Authentication routes (register, login)
    pub auth: RatePolicy,
    /// General read API
    pub api: RatePolicy,
    /// Create/update/delete routes
    pub write: RatePolicy,
    /// Key clients on the first `X-Forwarded-For` hop instead of the socket peer
    pub trust_proxy: bool,
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auth: RatePolicy::new(
                5,
                Duration::from_secs(15 * 60),
                "Too many authentication attempts, please try again after 15 minutes",
            ),
            api: RatePolicy::new(
                100,
                Duration::from_secs(15 * 60),
                "Too many requests, please try again later",
            ),
            write: RatePolicy::new(10, Duration::from_secs(60), "Too many write requests, please slow down"),
            trust_proxy: false,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry: Duration,
    pub bcrypt_cost: u32,
}

impl AppConfig {
    /// Build configuration from the process environment. Call after
    /// `dotenvy::dotenv()` so `.env` values are visible.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("APP_ENV").or_else(|_| env::var("NODE_ENV")).as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        // Server overrides
        if let Some(v) = var_any(&["ASM_API_PORT", "PORT"]) {
            self.server.port = parse_var("PORT", &v)?;
        }
        if let Ok(v) = env::var("CORS_ORIGIN") {
            self.server.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.server.enable_request_logging = parse_var("API_ENABLE_REQUEST_LOGGING", &v)?;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            url::Url::parse(&v).map_err(|e| ConfigError::invalid("DATABASE_URL", "<redacted>", e.to_string()))?;
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_var("DATABASE_MAX_CONNECTIONS", &v)?;
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = parse_var("DATABASE_CONNECTION_TIMEOUT", &v)?;
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = parse_var("DATABASE_RUN_MIGRATIONS", &v)?;
        }

        // Storage overrides
        if let Ok(v) = env::var("ASM_STORAGE") {
            self.storage.backend = match v.trim().to_ascii_lowercase().as_str() {
                "postgres" | "postgresql" => StorageBackend::Postgres,
                "memory" => StorageBackend::Memory,
                _ => return Err(ConfigError::invalid("ASM_STORAGE", v, "expected 'postgres' or 'memory'")),
            };
        }
        if let Ok(v) = env::var("UPLOAD_DIR") {
            self.storage.upload_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("MAX_UPLOAD_BYTES") {
            self.storage.max_upload_bytes = parse_var("MAX_UPLOAD_BYTES", &v)?;
        }

        // Rate limit overrides
        if let Ok(v) = env::var("RATE_LIMIT_ENABLED") {
            self.rate_limit.enabled = parse_var("RATE_LIMIT_ENABLED", &v)?;
        }
        if let Ok(v) = env::var("RATE_LIMIT_TRUST_PROXY") {
            self.rate_limit.trust_proxy = parse_var("RATE_LIMIT_TRUST_PROXY", &v)?;
        }
        override_policy(&mut self.rate_limit.auth, "RATE_LIMIT_AUTH_MAX", "RATE_LIMIT_AUTH_WINDOW_SECS")?;
        override_policy(&mut self.rate_limit.api, "RATE_LIMIT_API_MAX", "RATE_LIMIT_API_WINDOW_SECS")?;
        override_policy(&mut self.rate_limit.write, "RATE_LIMIT_WRITE_MAX", "RATE_LIMIT_WRITE_WINDOW_SECS")?;

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRE") {
            self.security.jwt_expiry = parse_duration(&v)
                .ok_or_else(|| ConfigError::invalid("JWT_EXPIRE", v.clone(), "expected e.g. 7d, 12h, 30m or seconds"))?;
        }
        if let Ok(v) = env::var("BCRYPT_ROUNDS") {
            self.security.bcrypt_cost = parse_var("BCRYPT_ROUNDS", &v)?;
        }

        Ok(self)
    }

    /// Reject configurations the server must not start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_secret(&self.security.jwt_secret)?;

        if self.storage.backend == StorageBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::MissingVar("DATABASE_URL"));
        }
        if self.security.jwt_expiry.is_zero() {
            return Err(ConfigError::invalid("JWT_EXPIRE", "0", "token lifetime must be positive"));
        }
        if !BCRYPT_COST_RANGE.contains(&self.security.bcrypt_cost) {
            return Err(ConfigError::invalid(
                "BCRYPT_ROUNDS",
                self.security.bcrypt_cost.to_string(),
                "must be between 4 and 31",
            ));
        }
        for (policy, max_key, window_key) in [
            (&self.rate_limit.auth, "RATE_LIMIT_AUTH_MAX", "RATE_LIMIT_AUTH_WINDOW_SECS"),
            (&self.rate_limit.api, "RATE_LIMIT_API_MAX", "RATE_LIMIT_API_WINDOW_SECS"),
            (&self.rate_limit.write, "RATE_LIMIT_WRITE_MAX", "RATE_LIMIT_WRITE_WINDOW_SECS"),
        ] {
            check_policy(policy, max_key, window_key)?;
        }

        Ok(())
    }

    /// Optional settings that fall back to defaults, reported once at startup
    pub fn missing_optional() -> Vec<&'static str> {
        ["CORS_ORIGIN", "JWT_EXPIRE", "BCRYPT_ROUNDS", "UPLOAD_DIR", "MAX_UPLOAD_BYTES"]
            .into_iter()
            .filter(|key| env::var(key).is_err())
            .collect()
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 5000,
                cors_origins: vec!["*".to_string()],
                enable_request_logging: true,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
            },
            storage: StorageConfig {
                backend: StorageBackend::Postgres,
                upload_dir: PathBuf::from("./uploads"),
                max_upload_bytes: 10 * 1024 * 1024, // 10MB
            },
            rate_limit: RateLimitConfig::default(),
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry: Duration::from_secs(7 * 24 * 60 * 60),
                bcrypt_cost: 10,
            },
        }
    }

    pub fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.server.cors_origins = vec!["https://staging.example.com".to_string()];
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config
    }

    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.server.cors_origins = vec!["https://app.example.com".to_string()];
        config.server.enable_request_logging = false;
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config.database.run_migrations = false;
        config.security.bcrypt_cost = 12;
        config
    }
}

pub fn validate_secret(secret: &str) -> Result<(), ConfigError> {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingVar("JWT_SECRET"));
    }
    if INSECURE_SECRETS.iter().any(|known| known.eq_ignore_ascii_case(trimmed)) {
        return Err(ConfigError::InsecureSecret);
    }
    Ok(())
}

/// Parse `7d`, `12h`, `30m`, `45s` or a bare number of seconds
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let (digits, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => raw.split_at(idx),
        None => (raw, "s"),
    };
    let amount: u64 = digits.parse().ok()?;
    let multiplier = match unit.trim() {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        "w" => 7 * 24 * 60 * 60,
        _ => return None,
    };
    amount.checked_mul(multiplier).map(Duration::from_secs)
}

fn var_any(keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| env::var(key).ok())
}

fn parse_var<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::invalid(key, value, e.to_string()))
}

fn override_policy(policy: &mut RatePolicy, max_key: &'static str, window_key: &'static str) -> Result<(), ConfigError> {
    if let Ok(v) = env::var(max_key) {
        policy.max_requests = parse_var(max_key, &v)?;
    }
    if let Ok(v) = env::var(window_key) {
        policy.window = Duration::from_secs(parse_var(window_key, &v)?);
    }
    check_policy(policy, max_key, window_key)
}

/// A zero quota or zero window would turn the limiter off
fn check_policy(policy: &RatePolicy, max_key: &'static str, window_key: &'static str) -> Result<(), ConfigError> {
    if policy.max_requests == 0 {
        return Err(ConfigError::invalid(max_key, "0", "must be greater than zero"));
    }
    if policy.window.is_zero() {
        return Err(ConfigError::invalid(window_key, "0", "must be greater than zero"));
    }
    Ok(())
}
