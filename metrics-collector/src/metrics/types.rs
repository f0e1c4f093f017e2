//! Request/Response Types

use mon_common::time::{fmt_ts, parse_ts};
use mon_common::ApiError;
use serde::{Deserialize, Serialize};

use crate::db::{AggregateRow, NewRawMetric};

const MAX_NAME: usize = 200;

/// Largest accepted ingest batch.
pub const MAX_BATCH: usize = 1000;

/// One submitted metric point.
#[derive(Debug, Deserialize)]
pub struct MetricPoint {
    pub name: String,
    #[serde(rename = "type")]
    pub metric_type: String,
    pub value: f64,
    #[serde(default)]
    pub labels: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Render a label map as its canonical JSON string. serde_json maps are
/// key-sorted, so equal label sets always serialize identically. An empty
/// or missing map stores as NULL.
pub fn canonical_labels(labels: Option<serde_json::Map<String, serde_json::Value>>) -> Option<String> {
    match labels {
        Some(map) if !map.is_empty() => Some(serde_json::Value::Object(map).to_string()),
        _ => None,
    }
}

impl MetricPoint {
    /// Validate and convert for persistence. `default_ts` fills a missing
    /// timestamp with server time.
    pub fn into_raw(self, default_ts: i64) -> Result<NewRawMetric, ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("name is required".into()));
        }
        if self.name.len() > MAX_NAME {
            return Err(ApiError::Validation(format!(
                "name exceeds {MAX_NAME} characters"
            )));
        }
        if !matches!(self.metric_type.as_str(), "counter" | "histogram" | "gauge") {
            return Err(ApiError::Validation(format!(
                "type must be counter, histogram, or gauge (got {})",
                self.metric_type
            )));
        }
        if !self.value.is_finite() {
            return Err(ApiError::Validation("value must be finite".into()));
        }

        let ts = match &self.timestamp {
            None => default_ts,
            Some(raw) => parse_ts(raw)
                .ok_or_else(|| ApiError::Validation(format!("invalid timestamp: {raw}")))?,
        };

        Ok(NewRawMetric {
            ts,
            name: self.name,
            labels: canonical_labels(self.labels),
            value: self.value,
            metric_type: self.metric_type,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub accepted: usize,
}

/// Aggregate query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct QueryParams {
    pub name: Option<String>,
    pub period: Option<String>,
    pub resolution: Option<String>,
    /// `k1:v1,k2:v2` — must match the stored canonical labels exactly.
    pub labels: Option<String>,
}

/// Parse a period string into seconds.
pub fn parse_period(period: Option<&str>) -> Result<i64, ApiError> {
    match period.unwrap_or("24h") {
        "1h" => Ok(3_600),
        "24h" => Ok(86_400),
        "7d" => Ok(7 * 86_400),
        "30d" => Ok(30 * 86_400),
        other => Err(ApiError::Validation(format!(
            "period must be one of 1h, 24h, 7d, 30d (got {other})"
        ))),
    }
}

/// Resolve the effective resolution: `auto` picks minute for periods up to
/// 24 hours and hour beyond.
pub fn resolve_resolution(
    resolution: Option<&str>,
    period_secs: i64,
) -> Result<&'static str, ApiError> {
    match resolution.unwrap_or("auto") {
        "minute" => Ok("minute"),
        "hour" => Ok("hour"),
        "auto" => Ok(if period_secs <= 86_400 { "minute" } else { "hour" }),
        other => Err(ApiError::Validation(format!(
            "resolution must be minute, hour, or auto (got {other})"
        ))),
    }
}

/// Parse a `k1:v1,k2:v2` label filter into canonical JSON.
pub fn parse_label_filter(raw: &str) -> Result<String, ApiError> {
    let mut map = serde_json::Map::new();
    for pair in raw.split(',') {
        let (key, value) = pair
            .split_once(':')
            .ok_or_else(|| ApiError::Validation(format!("malformed label filter: {pair}")))?;
        map.insert(
            key.trim().to_owned(),
            serde_json::Value::String(value.trim().to_owned()),
        );
    }
    Ok(serde_json::Value::Object(map).to_string())
}

/// Aggregate bucket as rendered on the API.
#[derive(Debug, Serialize)]
pub struct BucketView {
    pub bucket: String,
    pub count: i64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub p50: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
}

impl From<AggregateRow> for BucketView {
    fn from(r: AggregateRow) -> Self {
        Self {
            bucket: fmt_ts(r.bucket),
            count: r.count,
            sum: r.sum,
            min: r.min,
            max: r.max,
            avg: r.avg,
            p50: r.p50,
            p95: r.p95,
            p99: r.p99,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub name: String,
    pub resolution: &'static str,
    pub period: String,
    pub points: Vec<BucketView>,
}
