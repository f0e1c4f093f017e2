//! API Router and Application State

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use mon_common::auth::{require_api_key, ApiKey};
use mon_common::body_limit::{content_length_gate, BodyCap};
use mon_common::ratelimit::{rate_limit_by_ip, RateLimiter};
use serde_json::json;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::admin::handlers as admin;
use crate::admin::handlers::MAX_SOURCE_MAP_BYTES;
use crate::browser::forward::Forwarder;
use crate::browser::handlers as browser;
use crate::config::Config;
use crate::db;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Server configuration
    pub config: Arc<Config>,
    /// Downstream forwarding client
    pub forwarder: Forwarder,
}

impl AppState {
    #[must_use]
    pub fn new(db: SqlitePool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
            forwarder: Forwarder::new(),
        }
    }
}

/// `GET /health` — liveness plus the active key count.
async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let active_keys = db::count_active_keys(&state.db).await.unwrap_or(0);
    Json(json!({ "status": "ok", "active_keys": active_keys }))
}

/// CORS for the browser routes: exact-match allowlist, the two headers the
/// SDK sends, POST/OPTIONS only, 24 h preflight cache.
fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(origin) => Some(origin),
            Err(_) => {
                warn!(origin = %o, "Invalid CORS origin in configuration, skipping");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_headers([
            HeaderName::from_static("x-monlight-key"),
            header::CONTENT_TYPE,
        ])
        .allow_methods([Method::POST, Method::OPTIONS])
        .max_age(Duration::from_secs(86_400))
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    let admin_key = ApiKey::new(state.config.admin_api_key.clone());
    let limiter = RateLimiter::new(state.config.rate_limit, Duration::from_secs(60));

    // Source maps run to megabytes; the rest of the admin surface shares
    // the browser cap.
    let source_map_routes = Router::new()
        .route(
            "/api/source-maps",
            post(admin::upload_source_map).get(admin::list_source_maps),
        )
        .route("/api/source-maps/{id}", delete(admin::delete_source_map))
        .layer(from_fn_with_state(
            BodyCap(MAX_SOURCE_MAP_BYTES + 4 * 1024),
            content_length_gate,
        ))
        .layer(DefaultBodyLimit::max(MAX_SOURCE_MAP_BYTES + 4 * 1024));

    let admin_routes = Router::new()
        .route(
            "/api/dsn-keys",
            post(admin::create_dsn_key).get(admin::list_dsn_keys),
        )
        .route("/api/dsn-keys/{id}", delete(admin::delete_dsn_key))
        .layer(from_fn_with_state(
            BodyCap(state.config.max_body_size),
            content_length_gate,
        ))
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .merge(source_map_routes)
        .layer(from_fn_with_state(admin_key, require_api_key));

    let browser_routes = Router::new()
        .route("/api/browser/errors", post(browser::submit_error))
        .route("/api/browser/metrics", post(browser::submit_metrics))
        .layer(from_fn_with_state(
            BodyCap(state.config.max_body_size),
            content_length_gate,
        ))
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(cors_layer(&state.config));

    Router::new()
        .route("/health", get(health))
        .merge(admin_routes)
        .merge(browser_routes)
        .layer(from_fn_with_state(limiter, rate_limit_by_ip))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
