//! Monlight Metrics Collector - Main Entry Point

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use mon_metrics_collector::{api, config, db, rollup};

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
        "Starting Monlight Metrics Collector"
    );

    let pool = mon_common::db::create_pool(&config.database_path).await?;
    mon_common::db::run_migrations(&pool, db::MIGRATIONS).await?;

    let stop = Arc::new(AtomicBool::new(false));
    let rollup_handle =
        rollup::spawn_aggregation_task(pool.clone(), config.clone(), stop.clone());

    let state = api::AppState::new(pool.clone(), config.clone());
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Metrics Collector listening");

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
    let _ = rollup_handle.await;
    pool.close().await;

    info!("Metrics Collector shutdown complete");
    Ok(())
}
