//! Rollup and retention tests, driven directly against the store with
//! injected clocks so every bucket is deterministic.

mod common;

use common::{insert_raw, spawn_app};
use mon_metrics_collector::db;
use mon_metrics_collector::rollup;

const BUCKET: i64 = 6_000; // an arbitrary minute boundary

#[tokio::test]
async fn minute_rollup_computes_percentiles_for_histograms() {
    let app = spawn_app().await;
    for i in 1..=10 {
        insert_raw(
            &app.pool,
            BUCKET + i % 60,
            "latency",
            None,
            f64::from(i as i32) / 100.0,
            "histogram",
        )
        .await;
    }

    let series = rollup::minute_rollup_for_bucket(&app.pool, BUCKET).await.unwrap();
    assert_eq!(series, 1);

    let rows = db::query_aggregates(&app.pool, "latency", "minute", None, 0, i64::MAX)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.bucket, BUCKET);
    assert_eq!(row.count, 10);
    assert!((row.sum - 0.55).abs() < 1e-9);
    assert!((row.min - 0.01).abs() < 1e-9);
    assert!((row.max - 0.10).abs() < 1e-9);
    assert!((row.avg - 0.055).abs() < 1e-9);
    assert!((row.p50.unwrap() - 0.05).abs() < 1e-9);
    assert!((row.p95.unwrap() - 0.10).abs() < 1e-9);
    assert!((row.p99.unwrap() - 0.10).abs() < 1e-9);
}

#[tokio::test]
async fn counters_and_gauges_have_null_percentiles() {
    let app = spawn_app().await;
    insert_raw(&app.pool, BUCKET, "requests", None, 1.0, "counter").await;
    insert_raw(&app.pool, BUCKET + 1, "requests", None, 1.0, "counter").await;
    insert_raw(&app.pool, BUCKET + 2, "queue_depth", None, 7.0, "gauge").await;

    rollup::minute_rollup_for_bucket(&app.pool, BUCKET).await.unwrap();

    for name in ["requests", "queue_depth"] {
        let rows = db::query_aggregates(&app.pool, name, "minute", None, 0, i64::MAX)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1, "{name}");
        assert!(rows[0].p50.is_none());
        assert!(rows[0].p95.is_none());
        assert!(rows[0].p99.is_none());
    }
}

#[tokio::test]
async fn label_sets_roll_up_as_separate_series() {
    let app = spawn_app().await;
    insert_raw(&app.pool, BUCKET, "hits", Some(r#"{"route":"/a"}"#), 1.0, "counter").await;
    insert_raw(&app.pool, BUCKET, "hits", Some(r#"{"route":"/b"}"#), 1.0, "counter").await;
    insert_raw(&app.pool, BUCKET, "hits", None, 1.0, "counter").await;

    let series = rollup::minute_rollup_for_bucket(&app.pool, BUCKET).await.unwrap();
    assert_eq!(series, 3);

    let rows = db::query_aggregates(
        &app.pool,
        "hits",
        "minute",
        Some(r#"{"route":"/a"}"#),
        0,
        i64::MAX,
    )
    .await
    .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].count, 1);
}

#[tokio::test]
async fn rollup_pass_is_idempotent_per_bucket() {
    let app = spawn_app().await;
    insert_raw(&app.pool, BUCKET, "latency", None, 0.5, "histogram").await;

    rollup::minute_rollup_for_bucket(&app.pool, BUCKET).await.unwrap();
    rollup::minute_rollup_for_bucket(&app.pool, BUCKET).await.unwrap();

    let rows = db::query_aggregates(&app.pool, "latency", "minute", None, 0, i64::MAX)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn only_the_target_bucket_is_aggregated() {
    let app = spawn_app().await;
    insert_raw(&app.pool, BUCKET, "latency", None, 0.5, "histogram").await;
    insert_raw(&app.pool, BUCKET + 60, "latency", None, 0.9, "histogram").await;

    rollup::minute_rollup_for_bucket(&app.pool, BUCKET).await.unwrap();

    let rows = db::query_aggregates(&app.pool, "latency", "minute", None, 0, i64::MAX)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].bucket, BUCKET);
    assert_eq!(rows[0].count, 1);
}

#[tokio::test]
async fn hour_rollup_sums_counts_and_averages_percentiles() {
    let app = spawn_app().await;
    let hour = 7_200; // hour boundary

    // Two minute buckets inside the hour, 4 + 6 points.
    for i in 0..4 {
        insert_raw(&app.pool, hour + i, "latency", None, 0.05, "histogram").await;
    }
    for i in 0..6 {
        insert_raw(&app.pool, hour + 60 + i, "latency", None, 0.07, "histogram").await;
    }
    rollup::minute_rollup_for_bucket(&app.pool, hour).await.unwrap();
    rollup::minute_rollup_for_bucket(&app.pool, hour + 60).await.unwrap();

    let series = rollup::hour_rollup_for_bucket(&app.pool, hour).await.unwrap();
    assert_eq!(series, 1);

    let rows = db::query_aggregates(&app.pool, "latency", "hour", None, 0, i64::MAX)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.bucket, hour);
    assert_eq!(row.count, 10);
    let expected_sum = 4.0 * 0.05 + 6.0 * 0.07;
    assert!((row.sum - expected_sum).abs() < 1e-9);
    assert!((row.avg - expected_sum / 10.0).abs() < 1e-9);
    assert!((row.min - 0.05).abs() < 1e-9);
    assert!((row.max - 0.07).abs() < 1e-9);
    // Arithmetic mean of the two minute p50s (0.05 and 0.07).
    assert!((row.p50.unwrap() - 0.06).abs() < 1e-9);
}

#[tokio::test]
async fn tiered_retention_prunes_each_tier_at_its_own_cutoff() {
    let app = spawn_app().await;
    let now = 100 * 86_400;

    // Raw: one stale (2h old), one fresh.
    insert_raw(&app.pool, now - 7_200, "m", None, 1.0, "counter").await;
    insert_raw(&app.pool, now - 60, "m", None, 1.0, "counter").await;

    // Minute aggregates: one stale (25h), one fresh; hour: one stale (31d),
    // one fresh.
    for (bucket, resolution) in [
        (now - 25 * 3_600, "minute"),
        (now - 3_600, "minute"),
        (now - 31 * 86_400, "hour"),
        (now - 86_400, "hour"),
    ] {
        db::replace_aggregates(
            &app.pool,
            bucket,
            resolution,
            &[db::NewAggregate {
                bucket,
                resolution: if resolution == "minute" { "minute" } else { "hour" },
                name: "m".into(),
                labels: None,
                metric_type: "counter".into(),
                count: 1,
                sum: 1.0,
                min: 1.0,
                max: 1.0,
                avg: 1.0,
                p50: None,
                p95: None,
                p99: None,
            }],
        )
        .await
        .unwrap();
    }

    rollup::run_retention(&app.pool, &app.config, now).await;

    assert_eq!(db::count_raw(&app.pool).await.unwrap(), 1);
    let minute = db::query_aggregates(&app.pool, "m", "minute", None, 0, i64::MAX)
        .await
        .unwrap();
    assert_eq!(minute.len(), 1);
    let hour = db::query_aggregates(&app.pool, "m", "hour", None, 0, i64::MAX)
        .await
        .unwrap();
    assert_eq!(hour.len(), 1);
}
