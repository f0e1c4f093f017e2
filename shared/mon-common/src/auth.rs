//! API-Key Authentication
//!
//! Server clients and admin endpoints authenticate with the `X-API-Key`
//! header. The comparison is constant-time so the key cannot be recovered
//! byte-by-byte from response timing. `/health` routes are mounted outside
//! the protected router and never pass through this middleware.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;

/// Header carrying the server/admin API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Configured API key, shared with the middleware as router state.
#[derive(Clone)]
pub struct ApiKey(Arc<String>);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(Arc::new(key.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Compare two strings without early exit; the length difference is folded
/// into the accumulator so equal-prefix probes gain nothing.
pub fn constant_time_eq(expected: &str, presented: &str) -> bool {
    let expected_bytes = expected.as_bytes();
    let presented_bytes = presented.as_bytes();
    let max_len = expected_bytes.len().max(presented_bytes.len());
    let mut diff = expected_bytes.len() ^ presented_bytes.len();

    for idx in 0..max_len {
        let left = expected_bytes.get(idx).copied().unwrap_or(0);
        let right = presented_bytes.get(idx).copied().unwrap_or(0);
        diff |= usize::from(left ^ right);
    }

    diff == 0
}

/// Middleware rejecting requests whose `X-API-Key` does not match.
///
/// Apply with `from_fn_with_state(api_key.clone(), require_api_key)`.
pub async fn require_api_key(
    State(key): State<ApiKey>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if !constant_time_eq(key.as_str(), presented) {
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}
