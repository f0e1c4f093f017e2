//! HTTP Handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use mon_common::time::now;
use mon_common::ApiError;
use serde_json::json;

use super::types::{
    CreateDsnKeyRequest, DsnKeyView, SourceMapView, UploadSourceMapRequest,
};
use crate::api::AppState;
use crate::db;
use crate::sourcemap::normalize_frame_url;

/// Largest accepted source-map document: 5 MB of JSON text.
pub const MAX_SOURCE_MAP_BYTES: usize = 5 * 1024 * 1024;

/// `POST /api/dsn-keys` — mint a key for a project.
pub async fn create_dsn_key(
    State(state): State<AppState>,
    payload: Result<Json<CreateDsnKeyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DsnKeyView>), ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    if request.project.trim().is_empty() {
        return Err(ApiError::Validation("project is required".into()));
    }

    let key = db::create_dsn_key(&state.db, request.project.trim(), now()).await?;
    Ok((StatusCode::CREATED, Json(DsnKeyView::from(key))))
}

/// `GET /api/dsn-keys` — every key, active or not.
pub async fn list_dsn_keys(
    State(state): State<AppState>,
) -> Result<Json<Vec<DsnKeyView>>, ApiError> {
    let keys = db::list_dsn_keys(&state.db).await?;
    Ok(Json(keys.into_iter().map(DsnKeyView::from).collect()))
}

/// `DELETE /api/dsn-keys/{id}` — soft deactivation.
pub async fn delete_dsn_key(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !db::deactivate_dsn_key(&state.db, id).await? {
        return Err(ApiError::NotFound(format!("DSN key {id} not found")));
    }
    Ok(Json(json!({ "id": id, "active": false })))
}

/// `POST /api/source-maps` — upload or replace a map.
pub async fn upload_source_map(
    State(state): State<AppState>,
    payload: Result<Json<UploadSourceMapRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;

    for (name, value) in [
        ("project", &request.project),
        ("release", &request.release),
        ("file_url", &request.file_url),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::Validation(format!("{name} is required")));
        }
    }

    // Accept either an embedded object or a pre-serialized string.
    let content = match &request.content {
        serde_json::Value::String(raw) => raw.clone(),
        other => other.to_string(),
    };
    if content.len() > MAX_SOURCE_MAP_BYTES {
        return Err(ApiError::PayloadTooLarge);
    }
    if serde_json::from_str::<serde_json::Value>(&content).is_err() {
        return Err(ApiError::Validation("content is not valid JSON".into()));
    }

    let file_url = normalize_frame_url(request.file_url.trim());
    let id = db::upsert_source_map(
        &state.db,
        request.project.trim(),
        request.release.trim(),
        &file_url,
        &content,
        now(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": id,
            "project": request.project.trim(),
            "release": request.release.trim(),
            "file_url": file_url,
        })),
    ))
}

/// `GET /api/source-maps` — listing without content.
pub async fn list_source_maps(
    State(state): State<AppState>,
) -> Result<Json<Vec<SourceMapView>>, ApiError> {
    let maps = db::list_source_maps(&state.db).await?;
    Ok(Json(maps.into_iter().map(SourceMapView::from).collect()))
}

/// `DELETE /api/source-maps/{id}`
pub async fn delete_source_map(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !db::delete_source_map(&state.db, id).await? {
        return Err(ApiError::NotFound(format!("source map {id} not found")));
    }
    Ok(Json(json!({ "id": id, "deleted": true })))
}
