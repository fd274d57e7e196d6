//! Fixed-window request quotas per client address and route class.
//!
//! Counters live in this process only. Several API instances behind a load
//! balancer each enforce their own quota, so the effective limit scales with
//! the instance count until counters move to a shared store.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::config::{RateLimitConfig, RatePolicy};
use crate::error::ApiError;

static RATELIMIT_POLICY: HeaderName = HeaderName::from_static("ratelimit-policy");
static RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
static RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
static RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Routes sharing a quota
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateClass {
    /// register, login
    Strict,
    General,
    Write,
}

impl RateClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateClass::Strict => "strict",
            RateClass::General => "general",
            RateClass::Write => "write",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
}

/// Outcome of counting one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub limit: u32,
    pub remaining: u32,
    pub window: Duration,
    pub reset_after: Duration,
    pub exceeded: bool,
}

impl Decision {
    fn reset_secs(&self) -> u64 {
        ceil_secs(self.reset_after)
    }

    fn apply_headers(&self, headers: &mut HeaderMap) {
        let policy = format!("{};w={}", self.limit, self.window.as_secs());
        if let Ok(value) = HeaderValue::from_str(&policy) {
            headers.insert(RATELIMIT_POLICY.clone(), value);
        }
        headers.insert(RATELIMIT_LIMIT.clone(), HeaderValue::from(self.limit));
        headers.insert(RATELIMIT_REMAINING.clone(), HeaderValue::from(self.remaining));
        headers.insert(RATELIMIT_RESET.clone(), HeaderValue::from(self.reset_secs()));
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    config: Arc<RateLimitConfig>,
    counters: Arc<Mutex<HashMap<(RateClass, IpAddr), Window>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config: Arc::new(config),
            counters: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn policy(&self, class: RateClass) -> &RatePolicy {
        match class {
            RateClass::Strict => &self.config.auth,
            RateClass::General => &self.config.api,
            RateClass::Write => &self.config.write,
        }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn check(&self, class: RateClass, client: IpAddr) -> Decision {
        self.check_at(class, client, Instant::now())
    }

    /// Count a request made at `now`. The window restarts once its full
    /// duration has elapsed since the first request in it.
    pub fn check_at(&self, class: RateClass, client: IpAddr, now: Instant) -> Decision {
        let policy = self.policy(class);
        let mut counters = self.counters.lock();

        let window = counters.entry((class, client)).or_insert(Window { count: 0, started: now });
        if now.saturating_duration_since(window.started) >= policy.window {
            window.count = 0;
            window.started = now;
        }
        window.count = window.count.saturating_add(1);

        let elapsed = now.saturating_duration_since(window.started);
        Decision {
            limit: policy.max_requests,
            remaining: policy.max_requests.saturating_sub(window.count),
            window: policy.window,
            reset_after: policy.window.saturating_sub(elapsed),
            exceeded: window.count > policy.max_requests,
        }
    }

    /// Drop counters whose window has already run out; returns how many were removed
    pub fn purge_idle_at(&self, now: Instant) -> usize {
        let mut counters = self.counters.lock();
        let before = counters.len();
        counters.retain(|(class, _), window| {
            now.saturating_duration_since(window.started) < self.policy(*class).window
        });
        before - counters.len()
    }

    pub fn tracked(&self) -> usize {
        self.counters.lock().len()
    }

    /// Periodically evict idle counters. Aborted by `AppState::shutdown`.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let limiter = self.clone();
        let period = self.config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = limiter.purge_idle_at(Instant::now());
                if removed > 0 {
                    tracing::debug!(removed, "Evicted idle rate-limit counters");
                }
            }
        })
    }

    fn client_addr(&self, request: &Request) -> IpAddr {
        if self.config.trust_proxy {
            let forwarded = request
                .headers()
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .and_then(|hop| hop.trim().parse::<IpAddr>().ok());
            if let Some(addr) = forwarded {
                return addr;
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("enabled", &self.config.enabled)
            .field("tracked", &self.tracked())
            .finish()
    }
}

/// Middleware state: the shared limiter plus the class of the guarded route
#[derive(Clone, Debug)]
pub struct RateGate {
    pub limiter: RateLimiter,
    pub class: RateClass,
}

pub async fn throttle(State(gate): State<RateGate>, request: Request, next: Next) -> Response {
    if !gate.limiter.enabled() {
        return next.run(request).await;
    }

    let client = gate.limiter.client_addr(&request);
    let decision = gate.limiter.check(gate.class, client);

    let mut response = if decision.exceeded {
        tracing::warn!(
            client = %client,
            class = gate.class.as_str(),
            path = %request.uri().path(),
            retry_after_secs = decision.reset_secs(),
            "Rate limit exceeded"
        );
        ApiError::RateLimited {
            message: gate.limiter.policy(gate.class).message.clone(),
            retry_after_secs: decision.reset_secs(),
        }
        .into_response()
    } else {
        next.run(request).await
    };

    decision.apply_headers(response.headers_mut());
    response
}

fn ceil_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}
