//! Resolved-Group Retention
//!
//! Once per 24 hours, resolved groups older than the retention window are
//! deleted (occurrences cascade). Unresolved groups are never aged out. The
//! task sleeps in one-second increments so the stop flag is observed
//! promptly on shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tracing::{error, info};

const CYCLE_SECS: u64 = 24 * 60 * 60;

/// Spawn the daily retention task.
pub fn spawn_retention_task(
    pool: SqlitePool,
    retention_days: i64,
    stop: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut slept: u64 = 0;
        loop {
            if stop.load(Ordering::Relaxed) {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
            slept += 1;
            if slept < CYCLE_SECS {
                continue;
            }
            slept = 0;
            run_retention_cycle(&pool, retention_days, mon_common::time::now()).await;
        }
    })
}

/// Execute one retention sweep. Failures are logged, never propagated.
pub async fn run_retention_cycle(pool: &SqlitePool, retention_days: i64, now: i64) {
    let cutoff = now - retention_days * 86_400;
    match crate::db::sweep_resolved(pool, cutoff).await {
        Ok(deleted) if deleted > 0 => {
            info!(deleted, retention_days, "Retention sweep removed resolved groups");
        }
        Ok(_) => {}
        Err(e) => {
            error!(error = %e, "Retention sweep failed");
        }
    }
}
