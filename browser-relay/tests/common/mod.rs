//! Test harness: spawned relay plus stub downstream services that record
//! what the relay forwards.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use sqlx::SqlitePool;

use mon_browser_relay::{api, config::Config, db};

pub const ADMIN_KEY: &str = "admin-key";

pub type Received = Arc<Mutex<Vec<serde_json::Value>>>;

/// Spawn a stub downstream service that records every JSON body it
/// receives and answers with the given status.
pub async fn spawn_stub(path: &'static str, status: StatusCode) -> (String, Received) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let state = received.clone();

    let app = Router::new()
        .route(
            path,
            post(
                move |State(recorded): State<Received>, Json(body): Json<serde_json::Value>| async move {
                    recorded.lock().unwrap().push(body);
                    (status, Json(serde_json::json!({ "status": "stub-accepted" })))
                },
            ),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), received)
}

pub struct TestApp {
    pub base: String,
    pub pool: SqlitePool,
    pub error_tracker: Received,
    pub metrics: Received,
    _dir: tempfile::TempDir,
}

pub async fn spawn_relay() -> TestApp {
    let (error_url, error_tracker) = spawn_stub("/api/errors", StatusCode::CREATED).await;
    let (metrics_url, metrics) = spawn_stub("/api/metrics", StatusCode::ACCEPTED).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("relay.db");
    let mut config = Config::default_for_test(db_path.to_string_lossy().into_owned());
    config.error_tracker_url = error_url;
    config.metrics_collector_url = metrics_url;

    let pool = mon_common::db::create_pool(&config.database_path)
        .await
        .unwrap();
    mon_common::db::run_migrations(&pool, db::MIGRATIONS)
        .await
        .unwrap();

    let state = api::AppState::new(pool.clone(), config);
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        base: format!("http://{addr}"),
        pool,
        error_tracker,
        metrics,
        _dir: dir,
    }
}

/// Mint a DSN key through the admin API and return `(id, key)`.
pub async fn mint_key(app: &TestApp, project: &str) -> (i64, String) {
    let body: serde_json::Value = reqwest::Client::new()
        .post(format!("{}/api/dsn-keys", app.base))
        .header("X-API-Key", ADMIN_KEY)
        .json(&serde_json::json!({ "project": project }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    (
        body["id"].as_i64().unwrap(),
        body["key"].as_str().unwrap().to_owned(),
    )
}
