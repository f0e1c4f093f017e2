//! HTTP Handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use mon_common::time::now;
use mon_common::ApiError;

use super::types::{
    parse_label_filter, parse_period, resolve_resolution, BucketView, IngestResponse,
    MetricPoint, QueryParams, QueryResponse, MAX_BATCH,
};
use crate::api::AppState;
use crate::db;

/// `POST /api/metrics` — batch ingest, 202 Accepted. Aggregation is
/// asynchronous; nothing is rolled up on this path.
pub async fn ingest_metrics(
    State(state): State<AppState>,
    payload: Result<Json<Vec<MetricPoint>>, JsonRejection>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    let Json(points) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;

    if points.is_empty() {
        return Err(ApiError::Validation("batch must not be empty".into()));
    }
    if points.len() > MAX_BATCH {
        return Err(ApiError::Validation(format!(
            "batch exceeds {MAX_BATCH} points"
        )));
    }

    let default_ts = now();
    let raw: Vec<_> = points
        .into_iter()
        .map(|p| p.into_raw(default_ts))
        .collect::<Result<_, _>>()?;

    db::insert_raw_batch(&state.db, &raw).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(IngestResponse {
            accepted: raw.len(),
        }),
    ))
}

/// `GET /api/metrics?name=...` — aggregates in `[now − period, now]`,
/// ascending by bucket.
pub async fn query_metrics(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<QueryResponse>, ApiError> {
    let name = params
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::Validation("name is required".into()))?;

    let period_secs = parse_period(params.period.as_deref())?;
    let resolution = resolve_resolution(params.resolution.as_deref(), period_secs)?;
    let labels = params
        .labels
        .as_deref()
        .map(parse_label_filter)
        .transpose()?;

    let until = now();
    let since = until - period_secs;
    let rows =
        db::query_aggregates(&state.db, name, resolution, labels.as_deref(), since, until).await?;

    Ok(Json(QueryResponse {
        name: name.to_owned(),
        resolution,
        period: params.period.unwrap_or_else(|| "24h".to_owned()),
        points: rows.into_iter().map(BucketView::from).collect(),
    }))
}

/// `GET /api/metrics/names` — known metric names, ascending.
pub async fn list_names(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(db::list_names(&state.db).await?))
}
