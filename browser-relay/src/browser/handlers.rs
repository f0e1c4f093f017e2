//! HTTP Handlers

use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Json;
use mon_common::ApiError;
use serde_json::json;
use tracing::debug;

use super::types::{page_of, BrowserErrorRequest, BrowserMetricsRequest};
use crate::api::AppState;
use crate::db::{self, DsnKey};
use crate::sourcemap::{normalize_frame_url, rewrite, MappingIndex};

/// Header carrying the browser-visible DSN key.
pub const DSN_KEY_HEADER: &str = "x-monlight-key";

/// Resolve the DSN key header to an active key record, or 401.
async fn validate_dsn(state: &AppState, headers: &HeaderMap) -> Result<DsnKey, ApiError> {
    let presented = headers
        .get(DSN_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");
    if presented.is_empty() {
        return Err(ApiError::Unauthorized);
    }
    db::find_active_key(&state.db, presented)
        .await?
        .ok_or(ApiError::Unauthorized)
}

/// `POST /api/browser/errors` — deobfuscate and forward to the Error
/// Tracker.
pub async fn submit_error(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<BrowserErrorRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let key = validate_dsn(&state, &headers).await?;
    let Json(request) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    if request.message.is_empty() {
        return Err(ApiError::Validation("message is required".into()));
    }

    let release = request.release.as_deref().unwrap_or("");
    let traceback = match &request.stack {
        Some(stack) => deobfuscate(&state, &key.project, release, stack).await,
        None => request.message.clone(),
    };

    let mut extra = request.extra.unwrap_or_default();
    if let Some(session_id) = &request.session_id {
        extra.insert("session_id".into(), json!(session_id));
    }

    let body = json!({
        "project": key.project,
        "environment": request.environment.unwrap_or_else(|| "prod".to_owned()),
        "exception_type": request.exception_type.unwrap_or_else(|| "Error".to_owned()),
        "message": request.message,
        "traceback": traceback,
        "request_url": request.url,
        "request_method": "BROWSER",
        "user_id": request.user_id,
        "extra": extra,
    });

    Ok(state
        .forwarder
        .post_json(
            &state.config.error_tracker_url,
            "/api/errors",
            &state.config.error_tracker_api_key,
            &body,
        )
        .await)
}

/// Rewrite a stack through whatever maps exist for the frames' files.
/// Best-effort: lookup or decode failures leave frames untouched.
async fn deobfuscate(state: &AppState, project: &str, release: &str, stack: &str) -> String {
    let mut maps: HashMap<String, MappingIndex> = HashMap::new();

    for line in stack.lines() {
        let Some((frame, _)) = rewrite::parse_frame(line) else {
            continue;
        };
        let url = normalize_frame_url(&frame.file);
        if maps.contains_key(&url) {
            continue;
        }
        match db::get_source_map(&state.db, project, release, &url).await {
            Ok(Some(row)) => {
                if let Some(index) = MappingIndex::parse(&row.content) {
                    maps.insert(url, index);
                }
            }
            Ok(None) => {}
            Err(e) => {
                debug!(error = %e, url = %url, "Source map lookup failed");
            }
        }
    }

    rewrite::rewrite_stack(stack, &maps)
}

/// `POST /api/browser/metrics` — enrich labels and forward to the Metrics
/// Collector.
pub async fn submit_metrics(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<BrowserMetricsRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let key = validate_dsn(&state, &headers).await?;
    let Json(request) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    if request.points.is_empty() {
        return Err(ApiError::Validation("points must not be empty".into()));
    }

    let page = request.url.as_deref().map(page_of);
    let enriched: Vec<serde_json::Value> = request
        .points
        .into_iter()
        .map(|point| {
            let mut labels = point.labels.unwrap_or_default();
            labels.insert("project".into(), json!(key.project));
            labels.insert("source".into(), json!("browser"));
            if let Some(session_id) = &request.session_id {
                labels.insert("session_id".into(), json!(session_id));
            }
            if let Some(page) = &page {
                labels.insert("page".into(), json!(page));
            }
            json!({
                "name": point.name,
                "type": point.metric_type,
                "value": point.value,
                "labels": labels,
                "timestamp": point.timestamp,
            })
        })
        .collect();

    Ok(state
        .forwarder
        .post_json(
            &state.config.metrics_collector_url,
            "/api/metrics",
            &state.config.metrics_collector_api_key,
            &serde_json::Value::Array(enriched),
        )
        .await)
}
