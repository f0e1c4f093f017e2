//! Dashboard Projection
//!
//! A specialised read over raw points in the requested period: totals, top
//! metrics, and — when browser-sourced Web-Vitals points exist — a vitals
//! block with summary ratings, a time series, and a per-page breakdown.

use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::Json;
use mon_common::time::{fmt_ts, now};
use mon_common::ApiError;
use serde::{Deserialize, Serialize};

use super::types::parse_period;
use crate::api::AppState;
use crate::db;

const LCP: &str = "web_vitals_lcp";
const INP: &str = "web_vitals_inp";
const CLS: &str = "web_vitals_cls";

/// Web-Vitals rating thresholds: `(good_max, needs_improvement_max)`.
const LCP_THRESHOLDS: (f64, f64) = (2_500.0, 4_000.0);
const INP_THRESHOLDS: (f64, f64) = (200.0, 500.0);
const CLS_THRESHOLDS: (f64, f64) = (0.1, 0.25);

#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    pub period: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TopMetric {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct VitalSummary {
    pub avg: f64,
    pub rating: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SeriesPoint {
    pub bucket: String,
    pub value: f64,
}

#[derive(Debug, Serialize, Default)]
pub struct PageVitals {
    pub page: String,
    pub lcp: Option<f64>,
    pub inp: Option<f64>,
    pub cls: Option<f64>,
    pub samples: i64,
}

#[derive(Debug, Serialize)]
pub struct WebVitalsBlock {
    pub lcp: Option<VitalSummary>,
    pub inp: Option<VitalSummary>,
    pub cls: Option<VitalSummary>,
    pub series: BTreeMap<&'static str, Vec<SeriesPoint>>,
    pub pages: Vec<PageVitals>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub period: String,
    pub total_datapoints: i64,
    pub distinct_metrics: i64,
    pub top_metrics: Vec<TopMetric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_vitals: Option<WebVitalsBlock>,
}

/// Classify an average against `(good_max, needs_improvement_max)`.
pub fn rating(value: f64, thresholds: (f64, f64)) -> &'static str {
    if value <= thresholds.0 {
        "good"
    } else if value <= thresholds.1 {
        "needs-improvement"
    } else {
        "poor"
    }
}

/// `GET /api/dashboard` — raw-data projection for the period.
pub async fn dashboard(
    State(state): State<AppState>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let period_secs = parse_period(params.period.as_deref())?;
    let since = now() - period_secs;

    let (total_datapoints, distinct_metrics) = db::dashboard_totals(&state.db, since).await?;
    let top_metrics = db::top_metrics(&state.db, since, 10)
        .await?
        .into_iter()
        .map(|(name, count)| TopMetric { name, count })
        .collect();

    let web_vitals = if db::has_browser_vitals(&state.db, since).await? {
        Some(build_vitals_block(&state, since, period_secs).await?)
    } else {
        None
    };

    Ok(Json(DashboardResponse {
        period: params.period.unwrap_or_else(|| "24h".to_owned()),
        total_datapoints,
        distinct_metrics,
        top_metrics,
        web_vitals,
    }))
}

async fn build_vitals_block(
    state: &AppState,
    since: i64,
    period_secs: i64,
) -> Result<WebVitalsBlock, ApiError> {
    let bucket_secs = if period_secs <= 86_400 { 60 } else { 3_600 };

    let mut series = BTreeMap::new();
    for (key, name) in [("lcp", LCP), ("inp", INP), ("cls", CLS)] {
        let points = db::vitals_series(&state.db, name, since, bucket_secs)
            .await?
            .into_iter()
            .map(|(bucket, value)| SeriesPoint {
                bucket: fmt_ts(bucket),
                value,
            })
            .collect();
        series.insert(key, points);
    }

    let summary = |avg: Option<f64>, thresholds| {
        avg.map(|avg| VitalSummary {
            avg,
            rating: rating(avg, thresholds),
        })
    };
    let lcp = summary(db::vitals_average(&state.db, LCP, since).await?, LCP_THRESHOLDS);
    let inp = summary(db::vitals_average(&state.db, INP, since).await?, INP_THRESHOLDS);
    let cls = summary(db::vitals_average(&state.db, CLS, since).await?, CLS_THRESHOLDS);

    // Merge per-page rows from the three vitals into one breakdown.
    let mut pages: BTreeMap<String, PageVitals> = BTreeMap::new();
    for (name, pick) in [
        (LCP, 0_usize),
        (INP, 1),
        (CLS, 2),
    ] {
        for (page, avg, count) in db::vitals_by_page(&state.db, name, since).await? {
            let entry = pages.entry(page.clone()).or_insert_with(|| PageVitals {
                page,
                ..Default::default()
            });
            match pick {
                0 => entry.lcp = Some(avg),
                1 => entry.inp = Some(avg),
                _ => entry.cls = Some(avg),
            }
            entry.samples += count;
        }
    }

    Ok(WebVitalsBlock {
        lcp,
        inp,
        cls,
        series,
        pages: pages.into_values().collect(),
    })
}
