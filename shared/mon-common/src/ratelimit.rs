//! Sliding-Window Rate Limiting
//!
//! In-process per-key limiter. Each key owns a deque of request instants;
//! a check drops instants older than the window, rejects when the remaining
//! count has reached the limit, and records the new instant otherwise.
//! Keys default to the client IP. Exempt paths (always `/health`) bypass
//! the limiter entirely.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use dashmap::DashMap;
use tracing::debug;

use crate::error::ApiError;

/// Outcome of a single rate-limit check.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitResult {
    pub allowed: bool,
    /// Maximum requests allowed in the window.
    pub limit: u32,
    /// Requests left in the current window (0 when rejected).
    pub remaining: u32,
    /// Seconds until the oldest recorded request leaves the window.
    pub retry_after: u64,
}

struct Inner {
    limit: u32,
    window: Duration,
    trust_proxy: bool,
    exempt_paths: Vec<String>,
    windows: DashMap<String, VecDeque<Instant>>,
}

/// In-process sliding-window rate limiter, shared across handlers via clone.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

impl RateLimiter {
    /// Create a limiter allowing `limit` requests per `window` per key.
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                limit,
                window,
                trust_proxy: false,
                exempt_paths: vec!["/health".to_owned()],
                windows: DashMap::new(),
            }),
        }
    }

    /// Trust `X-Forwarded-For` when extracting the client key. Only enable
    /// behind a reverse proxy that overwrites the header.
    #[must_use]
    pub fn with_trust_proxy(mut self, trust_proxy: bool) -> Self {
        Arc::get_mut(&mut self.inner)
            .expect("with_trust_proxy must be called before the limiter is shared")
            .trust_proxy = trust_proxy;
        self
    }

    /// Replace the exempt path list.
    #[must_use]
    pub fn with_exempt_paths(mut self, paths: Vec<String>) -> Self {
        Arc::get_mut(&mut self.inner)
            .expect("with_exempt_paths must be called before the limiter is shared")
            .exempt_paths = paths;
        self
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        self.inner.exempt_paths.iter().any(|p| p == path)
    }

    /// Check and record a request for `key`.
    pub fn check(&self, key: &str) -> RateLimitResult {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> RateLimitResult {
        let limit = self.inner.limit;
        let window = self.inner.window;

        let mut entry = self.inner.windows.entry(key.to_owned()).or_default();
        while let Some(front) = entry.front() {
            if now.duration_since(*front) >= window {
                entry.pop_front();
            } else {
                break;
            }
        }

        if entry.len() as u32 >= limit {
            let oldest = *entry.front().expect("non-empty at limit");
            let until_free = window.saturating_sub(now.duration_since(oldest));
            let mut retry_after = until_free.as_secs();
            if until_free.subsec_nanos() > 0 {
                retry_after += 1;
            }
            return RateLimitResult {
                allowed: false,
                limit,
                remaining: 0,
                retry_after,
            };
        }

        entry.push_back(now);
        RateLimitResult {
            allowed: true,
            limit,
            remaining: limit - entry.len() as u32,
            retry_after: 0,
        }
    }

    /// Drop windows whose entries have all expired. Called opportunistically
    /// so idle keys do not accumulate forever.
    pub fn sweep(&self) {
        let now = Instant::now();
        let window = self.inner.window;
        self.inner
            .windows
            .retain(|_, deque| deque.back().is_some_and(|t| now.duration_since(*t) < window));
    }
}

/// Extract the client key for rate limiting: first `X-Forwarded-For` entry
/// when proxies are trusted, otherwise the peer address.
pub fn client_key(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
    trust_proxy: bool,
) -> String {
    if trust_proxy {
        if let Some(forwarded) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            return forwarded.to_owned();
        }
    }
    connect_info.map_or_else(|| "unknown".to_owned(), |ci| ci.0.ip().to_string())
}

/// Axum middleware enforcing the limiter keyed by client IP.
///
/// Apply with `from_fn_with_state(limiter.clone(), rate_limit_by_ip)`.
/// Peer addresses come from the `ConnectInfo` extension, present when the
/// app is served with `into_make_service_with_connect_info`.
#[tracing::instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn rate_limit_by_ip(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if limiter.is_exempt(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let connect_info = request.extensions().get::<ConnectInfo<SocketAddr>>();
    let key = client_key(
        request.headers(),
        connect_info,
        limiter.inner.trust_proxy,
    );
    let result = limiter.check(&key);
    if !result.allowed {
        debug!(key = %key, retry_after = result.retry_after, "Rate limit exceeded");
        return Err(ApiError::RateLimited {
            retry_after: result.retry_after,
        });
    }

    Ok(next.run(request).await)
}
