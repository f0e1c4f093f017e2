//! Test harness: spawn the service on an ephemeral port over a temp store.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mon_common::Notifier;
use sqlx::SqlitePool;

use mon_error_tracker::{api, config::Config, db};

pub const API_KEY: &str = "test-key";

type Sent = Arc<Mutex<Vec<(String, String, Vec<String>)>>>;

/// Notifier capturing dispatches for assertions.
pub struct RecordingNotifier {
    sent: Sent,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        subject: &str,
        body: &str,
        recipients: &[String],
    ) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push((
            subject.to_owned(),
            body.to_owned(),
            recipients.to_vec(),
        ));
        Ok(())
    }
}

pub struct TestApp {
    pub base: String,
    pub pool: SqlitePool,
    pub sent: Sent,
    _dir: tempfile::TempDir,
}

pub async fn spawn_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("errors.db");
    let config = Config::default_for_test(path.to_string_lossy().into_owned());

    let pool = mon_common::db::create_pool(&config.database_path)
        .await
        .unwrap();
    mon_common::db::run_migrations(&pool, db::MIGRATIONS)
        .await
        .unwrap();

    let sent: Sent = Arc::new(Mutex::new(Vec::new()));
    let notifier = Arc::new(RecordingNotifier { sent: sent.clone() });

    let state = api::AppState::new(pool.clone(), config, notifier);
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
        sent,
        _dir: dir,
    }
}

/// A report body whose traceback parses as a Python location.
pub fn sample_report() -> serde_json::Value {
    serde_json::json!({
        "project": "p",
        "exception_type": "ValueError",
        "message": "m",
        "traceback": "Traceback (most recent call last):\n  File \"/a.py\", line 56, in f\n    raise",
    })
}
