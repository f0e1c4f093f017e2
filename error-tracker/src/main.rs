//! Monlight Error Tracker - Main Entry Point

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use mon_common::notify::{NoopNotifier, Notifier, PostmarkNotifier};
use tracing::info;

use mon_error_tracker::{api, config, db, retention};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("LOG_LEVEL")
                .ok()
                .and_then(|lvl| tracing_subscriber::EnvFilter::try_new(lvl).ok())
                .unwrap_or_else(|| {
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| "info".into())
                }),
        )
        .json()
        .init();

    let config = config::Config::from_env()?;

    if mon_common::healthcheck::requested() {
        mon_common::healthcheck::run(&config.bind_address).await;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Monlight Error Tracker"
    );

    let pool = mon_common::db::create_pool(&config.database_path).await?;
    mon_common::db::run_migrations(&pool, db::MIGRATIONS).await?;

    let notifier: Arc<dyn Notifier> = if config.has_alerting() {
        info!("Postmark alerting enabled");
        Arc::new(PostmarkNotifier::new(
            config.postmark_api_token.clone().unwrap_or_default(),
            config.postmark_from_email.clone().unwrap_or_default(),
        ))
    } else {
        info!("Alerting not configured, notifications disabled");
        Arc::new(NoopNotifier)
    };

    let stop = Arc::new(AtomicBool::new(false));
    let retention_handle =
        retention::spawn_retention_task(pool.clone(), config.retention_days, stop.clone());

    let state = api::AppState::new(pool.clone(), config.clone(), notifier);
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Error Tracker listening");

    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await?;

    stop.store(true, Ordering::Relaxed);
    let _ = retention_handle.await;
    pool.close().await;

    info!("Error Tracker shutdown complete");
    Ok(())
}
