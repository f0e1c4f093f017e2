//! Test harness: temp store, fake container layout, spawned service.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use sqlx::SqlitePool;

use mon_log_viewer::{api, config::Config, db};

pub const API_KEY: &str = "test-key";

pub struct TestApp {
    pub base: String,
    pub pool: SqlitePool,
    pub config: Config,
    pub root: PathBuf,
    _dir: tempfile::TempDir,
}

pub async fn spawn_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("logs.db");
    let root = dir.path().join("containers");
    std::fs::create_dir(&root).unwrap();

    let config = Config::default_for_test(
        db_path.to_string_lossy().into_owned(),
        root.to_string_lossy().into_owned(),
    );

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
        root,
        _dir: dir,
    }
}

/// Create a container directory under the fake docker root and return its
/// JSON log file path.
pub fn write_container(root: &Path, id: &str, name: &str) -> PathBuf {
    let dir = root.join(id);
    std::fs::create_dir(&dir).unwrap();
    std::fs::write(
        dir.join("config.v2.json"),
        format!(r#"{{"Name":"/{name}"}}"#),
    )
    .unwrap();
    let log = dir.join(format!("{id}-json.log"));
    std::fs::write(&log, "").unwrap();
    log
}

/// Append Docker-JSON envelope lines to a log file.
pub fn append_lines(log: &Path, lines: &[(&str, &str, &str)]) {
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new().append(true).open(log).unwrap();
    for (text, stream, time) in lines {
        let envelope = serde_json::json!({
            "log": format!("{text}\n"),
            "stream": stream,
            "time": time,
        });
        writeln!(file, "{envelope}").unwrap();
    }
}

/// A direct insert that bypasses the tailer, for API-level tests.
pub async fn insert_entry(pool: &SqlitePool, ts: i64, container: &str, level: &str, message: &str) {
    db::insert_entries(
        pool,
        &[db::NewLogEntry {
            ts,
            container: container.to_owned(),
            stream: "stdout".to_owned(),
            level: level.to_owned(),
            message: message.to_owned(),
        }],
    )
    .await
    .unwrap();
}
