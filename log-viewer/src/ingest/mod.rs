//! Log Ingestion Pipeline
//!
//! One background task polls every watched container in sequence:
//! discover the container's log file, tail it from the saved cursor
//! (restarting on truncation or rotation), decode the Docker JSON envelope,
//! reassemble multiline entries, extract levels, persist, and prune the
//! ring buffer.

pub mod docker;
pub mod level;
pub mod reassemble;
pub mod tail;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tracing::{error, warn};

use crate::config::Config;

/// Spawn the ingestion task. Sleeps in one-second increments so the stop
/// flag is observed promptly.
pub fn spawn_ingest_task(
    pool: SqlitePool,
    config: Config,
    stop: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        // Discovered log file paths, per container. Cleared on rotation so
        // renamed directories are re-discovered.
        let mut paths: HashMap<String, PathBuf> = HashMap::new();
        let mut slept: u64 = 0;
        loop {
            if stop.load(Ordering::Relaxed) {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
            slept += 1;
            if slept < config.poll_interval.max(1) {
                continue;
            }
            slept = 0;
            run_poll_cycle(&pool, &config, &mut paths).await;
        }
    })
}

/// Poll every watched container once, then prune. Failures are logged per
/// container and never abort the cycle.
pub async fn run_poll_cycle(
    pool: &SqlitePool,
    config: &Config,
    paths: &mut HashMap<String, PathBuf>,
) {
    for container in &config.containers {
        let path = match paths.get(container) {
            Some(path) => path.clone(),
            None => match docker::discover_log_file(&config.log_sources, container) {
                Some(path) => {
                    paths.insert(container.clone(), path.clone());
                    path
                }
                // Still discovering; try again next cycle.
                None => continue,
            },
        };

        match tail::poll_container(pool, container, &path, config.tail_buffer).await {
            Ok(_) => {}
            Err(e) => {
                warn!(container = %container, error = %e, "Tail poll failed");
                // The directory may have been recreated; rediscover.
                paths.remove(container);
            }
        }
    }

    match crate::db::prune_to_max(pool, config.max_entries).await {
        Ok(pruned) if pruned > 0 => {
            tracing::debug!(pruned, "Ring buffer pruned");
        }
        Ok(_) => {}
        Err(e) => error!(error = %e, "Ring buffer prune failed"),
    }
}
