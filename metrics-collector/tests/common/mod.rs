//! Test harness: temp store, spawned service.

use std::net::SocketAddr;

use sqlx::SqlitePool;

use mon_metrics_collector::{api, config::Config, db};

pub const API_KEY: &str = "test-key";

pub struct TestApp {
    pub base: String,
    pub pool: SqlitePool,
    pub config: Config,
    _dir: tempfile::TempDir,
}

pub async fn spawn_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("metrics.db");
    let config = Config::default_for_test(db_path.to_string_lossy().into_owned());

    let pool = mon_common::db::create_pool(&config.database_path)
        .await
        .unwrap();
    mon_common::db::run_migrations(&pool, db::MIGRATIONS)
        .await
        .unwrap();

    let state = api::AppState::new(pool.clone(), config.clone());
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
        config,
        _dir: dir,
    }
}

/// Insert one raw point directly, bypassing the API.
pub async fn insert_raw(
    pool: &SqlitePool,
    ts: i64,
    name: &str,
    labels: Option<&str>,
    value: f64,
    metric_type: &str,
) {
    db::insert_raw_batch(
        pool,
        &[db::NewRawMetric {
            ts,
            name: name.to_owned(),
            labels: labels.map(str::to_owned),
            value,
            metric_type: metric_type.to_owned(),
        }],
    )
    .await
    .unwrap();
}
