//! Database Models

use sqlx::FromRow;

/// Raw point fields prior to insertion. `labels` is the canonical
/// (sorted-key) JSON rendering or `None`.
#[derive(Debug, Clone)]
pub struct NewRawMetric {
    pub ts: i64,
    pub name: String,
    pub labels: Option<String>,
    pub value: f64,
    pub metric_type: String,
}

/// One distinct series observed within a bucket.
#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct SeriesKey {
    pub name: String,
    pub labels: Option<String>,
    pub metric_type: String,
}

/// One aggregate row at `minute` or `hour` resolution.
#[derive(Debug, Clone, FromRow)]
pub struct AggregateRow {
    pub bucket: i64,
    pub resolution: String,
    pub name: String,
    pub labels: Option<String>,
    pub metric_type: String,
    pub count: i64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub p50: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
}

/// Aggregate fields prior to insertion.
#[derive(Debug, Clone)]
pub struct NewAggregate {
    pub bucket: i64,
    pub resolution: &'static str,
    pub name: String,
    pub labels: Option<String>,
    pub metric_type: String,
    pub count: i64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub p50: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
}
