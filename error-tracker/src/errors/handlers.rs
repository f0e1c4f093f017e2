//! HTTP Handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use mon_common::notify::spawn_notify;
use mon_common::time::now;
use mon_common::ApiError;

use super::alerts::alert_for_new_group;
use super::types::{
    DetailResponse, GroupView, IngestRequest, IngestResponse, ListParams, ListResponse,
    OccurrenceView,
};
use crate::api::AppState;
use crate::db::{self, GroupFilter, IngestOutcome, SourceFilter};
use crate::fingerprint::fingerprint;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

/// `POST /api/errors` — ingest one report.
///
/// 201 for `created` and `reopened`, 200 for `incremented`. A `created`
/// branch additionally dispatches a best-effort alert.
pub async fn ingest_error(
    State(state): State<AppState>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    let report = request.into_report()?;

    let fp = fingerprint(&report.project, &report.exception_type, &report.traceback);
    let (outcome, group_id, count) = db::ingest(&state.db, &fp, &report, now()).await?;

    if outcome == IngestOutcome::Created {
        let (subject, body) = alert_for_new_group(&state.config.base_url, group_id, &report);
        spawn_notify(
            state.notifier.clone(),
            subject,
            body,
            state.config.alert_emails.clone(),
        );
    }

    let status = match outcome {
        IngestOutcome::Incremented => StatusCode::OK,
        IngestOutcome::Created | IngestOutcome::Reopened => StatusCode::CREATED,
    };
    Ok((
        status,
        Json(IngestResponse {
            status: outcome.as_str(),
            group_id,
            count,
        }),
    ))
}

/// `GET /api/errors` — filtered listing, most recently seen first.
pub async fn list_errors(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, ApiError> {
    let source = match params.source.as_deref() {
        None => None,
        Some("browser") => Some(SourceFilter::Browser),
        Some("server") => Some(SourceFilter::Server),
        Some(other) => {
            return Err(ApiError::Validation(format!(
                "unknown source filter: {other}"
            )))
        }
    };

    let limit = match params.limit {
        Some(l) if l > 0 => l.min(MAX_LIMIT),
        _ => DEFAULT_LIMIT,
    };

    let filter = GroupFilter {
        project: params.project,
        environment: params.environment,
        resolved: params.resolved.unwrap_or(false),
        source,
        session_id: params.session_id,
        limit,
        offset: params.offset.unwrap_or(0).max(0),
    };

    let (groups, total) = db::list_groups(&state.db, &filter).await?;
    Ok(Json(ListResponse {
        total,
        errors: groups.into_iter().map(GroupView::from).collect(),
    }))
}

/// `GET /api/errors/{id}` — group plus its retained occurrences.
pub async fn get_error(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DetailResponse>, ApiError> {
    let group = db::get_group(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("error group {id} not found")))?;
    let occurrences = db::recent_occurrences(&state.db, id).await?;

    Ok(Json(DetailResponse {
        group: GroupView::from(group),
        occurrences: occurrences.into_iter().map(OccurrenceView::from).collect(),
    }))
}

/// `POST /api/errors/{id}/resolve` — idempotent resolve.
pub async fn resolve_error(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<GroupView>, ApiError> {
    let group = db::resolve_group(&state.db, id, now())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("error group {id} not found")))?;
    Ok(Json(GroupView::from(group)))
}

/// `GET /api/projects` — distinct project names, ascending.
pub async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(db::list_projects(&state.db).await?))
}
