//! Database Models

use sqlx::FromRow;

/// A browser-visible public key authorizing submissions for one project.
/// Deactivation is soft: the row stays for audit, `active` flips off.
#[derive(Debug, Clone, FromRow)]
pub struct DsnKey {
    pub id: i64,
    pub key: String,
    pub project: String,
    pub active: bool,
    pub created_at: i64,
}

/// One uploaded source map, unique per (project, release, file URL).
#[derive(Debug, Clone, FromRow)]
pub struct SourceMapRow {
    pub id: i64,
    pub project: String,
    pub release: String,
    pub file_url: String,
    pub content: String,
    pub uploaded_at: i64,
}

/// Source-map listing row; content is omitted (it runs to megabytes).
#[derive(Debug, Clone, FromRow)]
pub struct SourceMapMeta {
    pub id: i64,
    pub project: String,
    pub release: String,
    pub file_url: String,
    pub uploaded_at: i64,
}
