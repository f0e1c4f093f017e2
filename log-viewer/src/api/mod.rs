//! API Router and Application State

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, State};
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::{Json, Router};
use mon_common::auth::{require_api_key, ApiKey};
use mon_common::body_limit::{content_length_gate, BodyCap};
use mon_common::ratelimit::{rate_limit_by_ip, RateLimiter};
use serde_json::json;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db;
use crate::logs::{handlers, sse};

/// Requests per minute per client.
const RATE_LIMIT_PER_MIN: u32 = 60;

/// Request body cap: 64 KiB. The service is read-mostly; the gate exists so
/// stray uploads die early.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Server configuration
    pub config: Arc<Config>,
    /// Active live-tail connections (capacity-limited)
    pub tail_connections: Arc<AtomicUsize>,
}

impl AppState {
    #[must_use]
    pub fn new(db: SqlitePool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
            tail_connections: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// `GET /health` — liveness plus the ring-buffer size.
async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let entries = db::count_entries(&state.db).await.unwrap_or(0);
    Json(json!({ "status": "ok", "entries": entries }))
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    let api_key = ApiKey::new(state.config.api_key.clone());
    let limiter = RateLimiter::new(RATE_LIMIT_PER_MIN, Duration::from_secs(60));

    let protected = Router::new()
        .route("/api/logs", get(handlers::query_logs))
        .route("/api/logs/tail", get(sse::tail_logs))
        .route("/api/logs/containers", get(handlers::list_containers))
        .route("/api/logs/stats", get(handlers::stats))
        .layer(from_fn_with_state(api_key, require_api_key))
        .layer(from_fn_with_state(
            BodyCap(MAX_BODY_BYTES),
            content_length_gate,
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .layer(from_fn_with_state(limiter, rate_limit_by_ip))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
