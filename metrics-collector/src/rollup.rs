//! Tiered Rollups
//!
//! The aggregation task runs every `AGGREGATION_INTERVAL` seconds. Each
//! cycle rolls the previous completed minute up from raw points; every 60th
//! cycle also rolls the previous completed hour up from minute aggregates
//! and applies tiered retention. Raw points arriving for an already
//! rolled-up bucket are never re-aggregated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::db::{self, NewAggregate};
use mon_common::time::{hour_bucket, minute_bucket, now};

/// Nearest-rank percentile over a sorted slice: `r = ceil(p·n/100) − 1`,
/// clipped to `[0, n−1]`.
pub fn nearest_rank(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let n = sorted.len() as f64;
    let rank = (p * n / 100.0).ceil() as usize;
    let idx = rank.saturating_sub(1).min(sorted.len() - 1);
    Some(sorted[idx])
}

/// Spawn the aggregation task.
pub fn spawn_aggregation_task(
    pool: SqlitePool,
    config: Config,
    stop: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let interval = config.aggregation_interval.max(1);
        let mut slept: u64 = 0;
        let mut cycles: u64 = 0;
        loop {
            if stop.load(Ordering::Relaxed) {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
            slept += 1;
            if slept < interval {
                continue;
            }
            slept = 0;
            cycles += 1;

            let ts = now();
            run_minute_rollup(&pool, ts).await;
            if cycles % 60 == 0 {
                run_hour_rollup(&pool, ts).await;
                run_retention(&pool, &config, ts).await;
            }
        }
    })
}

/// Roll the previous completed minute up from raw points. Failures are
/// logged, never propagated.
pub async fn run_minute_rollup(pool: &SqlitePool, ts: i64) {
    let bucket = minute_bucket(ts) - 60;
    if let Err(e) = minute_rollup_for_bucket(pool, bucket).await {
        error!(error = %e, bucket, "Minute rollup failed");
    }
}

/// Aggregate one minute bucket. Exposed separately so tests can target an
/// exact bucket.
pub async fn minute_rollup_for_bucket(pool: &SqlitePool, bucket: i64) -> sqlx::Result<usize> {
    let series = db::series_in_window(pool, bucket, bucket + 60).await?;
    if series.is_empty() {
        return Ok(0);
    }

    let mut rows = Vec::with_capacity(series.len());
    for key in &series {
        let mut values = db::series_values(pool, key, bucket, bucket + 60).await?;
        if values.is_empty() {
            continue;
        }
        values.sort_by(f64::total_cmp);

        let count = values.len() as i64;
        let sum: f64 = values.iter().sum();
        let min = values[0];
        let max = values[values.len() - 1];
        let avg = sum / count as f64;

        let (p50, p95, p99) = if key.metric_type == "histogram" {
            (
                nearest_rank(&values, 50.0),
                nearest_rank(&values, 95.0),
                nearest_rank(&values, 99.0),
            )
        } else {
            (None, None, None)
        };

        rows.push(NewAggregate {
            bucket,
            resolution: "minute",
            name: key.name.clone(),
            labels: key.labels.clone(),
            metric_type: key.metric_type.clone(),
            count,
            sum,
            min,
            max,
            avg,
            p50,
            p95,
            p99,
        });
    }

    db::replace_aggregates(pool, bucket, "minute", &rows).await?;
    debug!(bucket, series = rows.len(), "Minute rollup complete");
    Ok(rows.len())
}

/// Roll the previous completed hour up from minute aggregates.
pub async fn run_hour_rollup(pool: &SqlitePool, ts: i64) {
    let bucket = hour_bucket(ts) - 3600;
    if let Err(e) = hour_rollup_for_bucket(pool, bucket).await {
        error!(error = %e, bucket, "Hour rollup failed");
    }
}

/// Aggregate one hour bucket from its minute rows. Hour percentiles are the
/// arithmetic mean of the minute percentiles — a documented approximation,
/// deterministic but not statistically exact.
pub async fn hour_rollup_for_bucket(pool: &SqlitePool, bucket: i64) -> sqlx::Result<usize> {
    let minutes = db::minute_rows_in_window(pool, bucket, bucket + 3600).await?;
    if minutes.is_empty() {
        return Ok(0);
    }

    // Group by (name, labels); minute rows arrive sorted on those keys.
    let mut rows: Vec<NewAggregate> = Vec::new();
    for row in minutes {
        let same_group = rows.last().is_some_and(|last: &NewAggregate| {
            last.name == row.name && last.labels == row.labels
        });
        if same_group {
            let agg = rows.last_mut().expect("group exists");
            agg.count += row.count;
            agg.sum += row.sum;
            agg.min = agg.min.min(row.min);
            agg.max = agg.max.max(row.max);
            push_percentile(&mut agg.p50, row.p50);
            push_percentile(&mut agg.p95, row.p95);
            push_percentile(&mut agg.p99, row.p99);
        } else {
            rows.push(NewAggregate {
                bucket,
                resolution: "hour",
                name: row.name,
                labels: row.labels,
                metric_type: row.metric_type,
                count: row.count,
                sum: row.sum,
                min: row.min,
                max: row.max,
                avg: 0.0, // finalized below
                p50: row.p50,
                p95: row.p95,
                p99: row.p99,
            });
        }
    }

    // Second pass: avg = Σsum/Σcount and percentile means.
    let counts = percentile_counts(pool, bucket).await?;
    for (agg, minute_count) in rows.iter_mut().zip(counts) {
        agg.avg = if agg.count > 0 {
            agg.sum / agg.count as f64
        } else {
            0.0
        };
        finalize_percentile(&mut agg.p50, minute_count);
        finalize_percentile(&mut agg.p95, minute_count);
        finalize_percentile(&mut agg.p99, minute_count);
    }

    db::replace_aggregates(pool, bucket, "hour", &rows).await?;
    debug!(bucket, series = rows.len(), "Hour rollup complete");
    Ok(rows.len())
}

/// Running sum of minute percentiles; divided by the contributing-minute
/// count in [`finalize_percentile`].
fn push_percentile(acc: &mut Option<f64>, value: Option<f64>) {
    if let Some(v) = value {
        *acc = Some(acc.unwrap_or(0.0) + v);
    }
}

fn finalize_percentile(acc: &mut Option<f64>, contributing: i64) {
    if let Some(total) = *acc {
        if contributing > 0 {
            *acc = Some(total / contributing as f64);
        }
    }
}

/// Per-group count of minute rows carrying percentiles, in the same group
/// order the rollup iterates.
async fn percentile_counts(pool: &SqlitePool, bucket: i64) -> sqlx::Result<Vec<i64>> {
    sqlx::query_scalar(
        "SELECT COUNT(p50) FROM aggregated_metrics
         WHERE resolution = 'minute' AND bucket >= ? AND bucket < ?
         GROUP BY name, labels ORDER BY name, labels",
    )
    .bind(bucket)
    .bind(bucket + 3600)
    .fetch_all(pool)
    .await
}

/// Apply tiered retention cutoffs.
pub async fn run_retention(pool: &SqlitePool, config: &Config, ts: i64) {
    let raw_cutoff = ts - config.retention_raw_hours * 3600;
    let minute_cutoff = ts - config.retention_minute_hours * 3600;
    let hour_cutoff = ts - config.retention_hourly_days * 86_400;

    match db::prune_tiers(pool, raw_cutoff, minute_cutoff, hour_cutoff).await {
        Ok((raw, minute, hour)) if raw + minute + hour > 0 => {
            info!(raw, minute, hour, "Metric retention removed rows");
        }
        Ok(_) => {}
        Err(e) => error!(error = %e, "Metric retention failed"),
    }
}
