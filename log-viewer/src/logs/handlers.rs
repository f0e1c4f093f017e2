//! HTTP Handlers

use axum::extract::{Query, State};
use axum::Json;
use mon_common::time::parse_ts;
use mon_common::ApiError;

use super::types::{
    ContainerInfo, ListResponse, LogEntryView, LogQueryParams, StatsResponse,
};
use crate::api::AppState;
use crate::db::{self, LogFilter};

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

fn parse_bound(name: &str, value: Option<&str>) -> Result<Option<i64>, ApiError> {
    match value {
        None => Ok(None),
        Some(raw) => parse_ts(raw)
            .map(Some)
            .ok_or_else(|| ApiError::Validation(format!("invalid {name} timestamp: {raw}"))),
    }
}

/// `GET /api/logs` — filtered query, newest first.
pub async fn query_logs(
    State(state): State<AppState>,
    Query(params): Query<LogQueryParams>,
) -> Result<Json<ListResponse>, ApiError> {
    let limit = match params.limit {
        Some(l) if l > 0 => l.min(MAX_LIMIT),
        _ => DEFAULT_LIMIT,
    };

    let filter = LogFilter {
        container: params.container,
        level: params.level.map(|l| l.to_ascii_uppercase()),
        search: params.search,
        since: parse_bound("since", params.since.as_deref())?,
        until: parse_bound("until", params.until.as_deref())?,
        limit,
        offset: params.offset.unwrap_or(0).max(0),
    };

    let entries = db::query_entries(&state.db, &filter).await?;
    Ok(Json(ListResponse {
        logs: entries.into_iter().map(LogEntryView::from).collect(),
    }))
}

/// `GET /api/logs/containers` — containers with entry counts.
pub async fn list_containers(
    State(state): State<AppState>,
) -> Result<Json<Vec<ContainerInfo>>, ApiError> {
    let containers = db::list_containers(&state.db).await?;
    Ok(Json(
        containers
            .into_iter()
            .map(|(container, count)| ContainerInfo { container, count })
            .collect(),
    ))
}

/// `GET /api/logs/stats` — ring-buffer statistics.
pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = db::stats(&state.db).await?;
    Ok(Json(StatsResponse::from(stats)))
}
