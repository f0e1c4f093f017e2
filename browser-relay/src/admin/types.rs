//! Admin Request/Response Types

use mon_common::time::fmt_ts;
use serde::{Deserialize, Serialize};

use crate::db::{DsnKey, SourceMapMeta};

#[derive(Debug, Deserialize)]
pub struct CreateDsnKeyRequest {
    pub project: String,
}

#[derive(Debug, Serialize)]
pub struct DsnKeyView {
    pub id: i64,
    pub key: String,
    pub project: String,
    pub active: bool,
    pub created_at: String,
}

impl From<DsnKey> for DsnKeyView {
    fn from(k: DsnKey) -> Self {
        Self {
            id: k.id,
            key: k.key,
            project: k.project,
            active: k.active,
            created_at: fmt_ts(k.created_at),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadSourceMapRequest {
    pub project: String,
    pub release: String,
    pub file_url: String,
    /// Source-map v3 document, as an object or pre-serialized string.
    pub content: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct SourceMapView {
    pub id: i64,
    pub project: String,
    pub release: String,
    pub file_url: String,
    pub uploaded_at: String,
}

impl From<SourceMapMeta> for SourceMapView {
    fn from(m: SourceMapMeta) -> Self {
        Self {
            id: m.id,
            project: m.project,
            release: m.release,
            file_url: m.file_url,
            uploaded_at: fmt_ts(m.uploaded_at),
        }
    }
}
