//! API Router and Application State

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, State};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::{Json, Router};
use mon_common::auth::{require_api_key, ApiKey};
use mon_common::body_limit::{content_length_gate, BodyCap};
use mon_common::ratelimit::{rate_limit_by_ip, RateLimiter};
use serde_json::json;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db;
use crate::metrics::{dashboard, handlers};

/// Requests per minute per client.
const RATE_LIMIT_PER_MIN: u32 = 200;

/// Request body cap: 512 KiB (the largest of the four services; ingest
/// batches run to 1000 points).
const MAX_BODY_BYTES: usize = 512 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Server configuration
    pub config: Arc<Config>,
}

impl AppState {
    #[must_use]
    pub fn new(db: SqlitePool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}

/// `GET /health` — liveness plus the raw point count.
async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let raw_points = db::count_raw(&state.db).await.unwrap_or(0);
    Json(json!({ "status": "ok", "raw_points": raw_points }))
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    let api_key = ApiKey::new(state.config.api_key.clone());
    let limiter = RateLimiter::new(RATE_LIMIT_PER_MIN, Duration::from_secs(60));

    let protected = Router::new()
        .route(
            "/api/metrics",
            post(handlers::ingest_metrics).get(handlers::query_metrics),
        )
        .route("/api/metrics/names", get(handlers::list_names))
        .route("/api/dashboard", get(dashboard::dashboard))
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
