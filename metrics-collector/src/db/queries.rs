//! Database Queries

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::models::{AggregateRow, NewAggregate, NewRawMetric, SeriesKey};

/// Insert a batch of raw points in one transaction.
pub async fn insert_raw_batch(pool: &SqlitePool, points: &[NewRawMetric]) -> sqlx::Result<()> {
    if points.is_empty() {
        return Ok(());
    }
    let mut tx = pool.begin().await?;
    for point in points {
        sqlx::query(
            "INSERT INTO raw_metrics (ts, name, labels, value, metric_type)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(point.ts)
        .bind(&point.name)
        .bind(&point.labels)
        .bind(point.value)
        .bind(&point.metric_type)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Distinct `(name, labels, type)` series with raw rows in `[start, end)`.
pub async fn series_in_window(
    pool: &SqlitePool,
    start: i64,
    end: i64,
) -> sqlx::Result<Vec<SeriesKey>> {
    sqlx::query_as::<_, SeriesKey>(
        "SELECT DISTINCT name, labels, metric_type FROM raw_metrics
         WHERE ts >= ? AND ts < ?",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}

/// All raw values for one series in `[start, end)`.
pub async fn series_values(
    pool: &SqlitePool,
    series: &SeriesKey,
    start: i64,
    end: i64,
) -> sqlx::Result<Vec<f64>> {
    sqlx::query_scalar(
        "SELECT value FROM raw_metrics
         WHERE name = ? AND labels IS ? AND metric_type = ? AND ts >= ? AND ts < ?",
    )
    .bind(&series.name)
    .bind(&series.labels)
    .bind(&series.metric_type)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}

/// Replace the aggregate rows for one `(bucket, resolution)` pass. Deleting
/// first keeps a re-run of the same bucket from doubling rows.
pub async fn replace_aggregates(
    pool: &SqlitePool,
    bucket: i64,
    resolution: &str,
    rows: &[NewAggregate],
) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM aggregated_metrics WHERE bucket = ? AND resolution = ?")
        .bind(bucket)
        .bind(resolution)
        .execute(&mut *tx)
        .await?;
    for row in rows {
        sqlx::query(
            "INSERT INTO aggregated_metrics
                 (bucket, resolution, name, labels, metric_type,
                  count, sum, min, max, avg, p50, p95, p99)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(row.bucket)
        .bind(row.resolution)
        .bind(&row.name)
        .bind(&row.labels)
        .bind(&row.metric_type)
        .bind(row.count)
        .bind(row.sum)
        .bind(row.min)
        .bind(row.max)
        .bind(row.avg)
        .bind(row.p50)
        .bind(row.p95)
        .bind(row.p99)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Minute aggregates in `[start, end)`, feeding the hour rollup.
pub async fn minute_rows_in_window(
    pool: &SqlitePool,
    start: i64,
    end: i64,
) -> sqlx::Result<Vec<AggregateRow>> {
    sqlx::query_as::<_, AggregateRow>(
        "SELECT bucket, resolution, name, labels, metric_type,
                count, sum, min, max, avg, p50, p95, p99
         FROM aggregated_metrics
         WHERE resolution = 'minute' AND bucket >= ? AND bucket < ?
         ORDER BY name, labels, bucket",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}

/// Aggregates for one metric at one resolution, ascending by bucket.
/// `labels` of `None` matches any label set; `Some` must equal the stored
/// canonical JSON exactly.
pub async fn query_aggregates(
    pool: &SqlitePool,
    name: &str,
    resolution: &str,
    labels: Option<&str>,
    since: i64,
    until: i64,
) -> sqlx::Result<Vec<AggregateRow>> {
    let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
        "SELECT bucket, resolution, name, labels, metric_type,
                count, sum, min, max, avg, p50, p95, p99
         FROM aggregated_metrics WHERE name = ",
    );
    qb.push_bind(name.to_owned());
    qb.push(" AND resolution = ").push_bind(resolution.to_owned());
    if let Some(labels) = labels {
        qb.push(" AND labels = ").push_bind(labels.to_owned());
    }
    qb.push(" AND bucket >= ").push_bind(since);
    qb.push(" AND bucket <= ").push_bind(until);
    qb.push(" ORDER BY bucket ASC");
    qb.build_query_as::<AggregateRow>().fetch_all(pool).await
}

/// Tiered retention deletes. Returns `(raw, minute, hour)` rows removed.
pub async fn prune_tiers(
    pool: &SqlitePool,
    raw_cutoff: i64,
    minute_cutoff: i64,
    hour_cutoff: i64,
) -> sqlx::Result<(u64, u64, u64)> {
    let raw = sqlx::query("DELETE FROM raw_metrics WHERE ts < ?")
        .bind(raw_cutoff)
        .execute(pool)
        .await?
        .rows_affected();
    let minute =
        sqlx::query("DELETE FROM aggregated_metrics WHERE resolution = 'minute' AND bucket < ?")
            .bind(minute_cutoff)
            .execute(pool)
            .await?
            .rows_affected();
    let hour =
        sqlx::query("DELETE FROM aggregated_metrics WHERE resolution = 'hour' AND bucket < ?")
            .bind(hour_cutoff)
            .execute(pool)
            .await?
            .rows_affected();
    Ok((raw, minute, hour))
}

/// Known metric names across raw points and aggregates, ascending.
pub async fn list_names(pool: &SqlitePool) -> sqlx::Result<Vec<String>> {
    sqlx::query_scalar(
        "SELECT name FROM raw_metrics
         UNION
         SELECT name FROM aggregated_metrics
         ORDER BY name ASC",
    )
    .fetch_all(pool)
    .await
}

/// Total raw point count, reported by `/health`.
pub async fn count_raw(pool: &SqlitePool) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM raw_metrics")
        .fetch_one(pool)
        .await
}

// ============================================================================
// Dashboard projections (raw data in a period)
// ============================================================================

/// Raw datapoint count and distinct names since `since`.
pub async fn dashboard_totals(pool: &SqlitePool, since: i64) -> sqlx::Result<(i64, i64)> {
    sqlx::query_as(
        "SELECT COUNT(*), COUNT(DISTINCT name) FROM raw_metrics WHERE ts >= ?",
    )
    .bind(since)
    .fetch_one(pool)
    .await
}

/// Top metrics by raw count since `since`.
pub async fn top_metrics(
    pool: &SqlitePool,
    since: i64,
    limit: i64,
) -> sqlx::Result<Vec<(String, i64)>> {
    sqlx::query_as(
        "SELECT name, COUNT(*) AS n FROM raw_metrics WHERE ts >= ?
         GROUP BY name ORDER BY n DESC, name ASC LIMIT ?",
    )
    .bind(since)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Whether any browser-sourced Web-Vitals point exists since `since`.
pub async fn has_browser_vitals(pool: &SqlitePool, since: i64) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM raw_metrics
         WHERE ts >= ? AND name LIKE 'web_vitals_%'
           AND json_extract(labels, '$.source') = 'browser'",
    )
    .bind(since)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

/// Average of one Web-Vitals metric since `since`.
pub async fn vitals_average(
    pool: &SqlitePool,
    name: &str,
    since: i64,
) -> sqlx::Result<Option<f64>> {
    sqlx::query_scalar("SELECT AVG(value) FROM raw_metrics WHERE ts >= ? AND name = ?")
        .bind(since)
        .bind(name)
        .fetch_one(pool)
        .await
}

/// Time series of one Web-Vitals metric, averaged per bucket.
pub async fn vitals_series(
    pool: &SqlitePool,
    name: &str,
    since: i64,
    bucket_secs: i64,
) -> sqlx::Result<Vec<(i64, f64)>> {
    sqlx::query_as(
        "SELECT (ts - ts % ?) AS bucket, AVG(value)
         FROM raw_metrics WHERE ts >= ? AND name = ?
         GROUP BY bucket ORDER BY bucket ASC",
    )
    .bind(bucket_secs)
    .bind(since)
    .bind(name)
    .fetch_all(pool)
    .await
}

/// Per-page averages of one Web-Vitals metric since `since`.
pub async fn vitals_by_page(
    pool: &SqlitePool,
    name: &str,
    since: i64,
) -> sqlx::Result<Vec<(String, f64, i64)>> {
    sqlx::query_as(
        "SELECT json_extract(labels, '$.page') AS page, AVG(value), COUNT(*)
         FROM raw_metrics
         WHERE ts >= ? AND name = ? AND json_extract(labels, '$.page') IS NOT NULL
         GROUP BY page ORDER BY page ASC",
    )
    .bind(since)
    .bind(name)
    .fetch_all(pool)
    .await
}
