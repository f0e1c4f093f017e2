//! Database Queries

use rand::RngCore;
use sqlx::SqlitePool;

use super::models::{DsnKey, SourceMapMeta, SourceMapRow};

/// Generate a 32-char lowercase hex DSN key.
pub fn generate_key() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Create a DSN key for a project.
pub async fn create_dsn_key(pool: &SqlitePool, project: &str, now: i64) -> sqlx::Result<DsnKey> {
    let key = generate_key();
    sqlx::query_as::<_, DsnKey>(
        "INSERT INTO dsn_keys (key, project, active, created_at)
         VALUES (?, ?, 1, ?)
         RETURNING *",
    )
    .bind(&key)
    .bind(project)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// All keys, newest first.
pub async fn list_dsn_keys(pool: &SqlitePool) -> sqlx::Result<Vec<DsnKey>> {
    sqlx::query_as::<_, DsnKey>("SELECT * FROM dsn_keys ORDER BY created_at DESC, id DESC")
        .fetch_all(pool)
        .await
}

/// Soft-deactivate a key. Returns false when the id is unknown.
pub async fn deactivate_dsn_key(pool: &SqlitePool, id: i64) -> sqlx::Result<bool> {
    let result = sqlx::query("UPDATE dsn_keys SET active = 0 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Look up an active key; inactive and unknown keys both miss.
pub async fn find_active_key(pool: &SqlitePool, key: &str) -> sqlx::Result<Option<DsnKey>> {
    sqlx::query_as::<_, DsnKey>("SELECT * FROM dsn_keys WHERE key = ? AND active = 1")
        .bind(key)
        .fetch_optional(pool)
        .await
}

/// Active key count, reported by `/health`.
pub async fn count_active_keys(pool: &SqlitePool) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM dsn_keys WHERE active = 1")
        .fetch_one(pool)
        .await
}

/// Upsert a source map; re-upload for the same (project, release, file URL)
/// replaces the content.
pub async fn upsert_source_map(
    pool: &SqlitePool,
    project: &str,
    release: &str,
    file_url: &str,
    content: &str,
    now: i64,
) -> sqlx::Result<i64> {
    sqlx::query_scalar(
        "INSERT INTO source_maps (project, release, file_url, content, uploaded_at)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(project, release, file_url) DO UPDATE SET
             content = excluded.content,
             uploaded_at = excluded.uploaded_at
         RETURNING id",
    )
    .bind(project)
    .bind(release)
    .bind(file_url)
    .bind(content)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// All maps without content, newest first.
pub async fn list_source_maps(pool: &SqlitePool) -> sqlx::Result<Vec<SourceMapMeta>> {
    sqlx::query_as::<_, SourceMapMeta>(
        "SELECT id, project, release, file_url, uploaded_at FROM source_maps
         ORDER BY uploaded_at DESC, id DESC",
    )
    .fetch_all(pool)
    .await
}

/// Delete a map by id. Returns false when the id is unknown.
pub async fn delete_source_map(pool: &SqlitePool, id: i64) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM source_maps WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Fetch one map's content by its lookup triple.
pub async fn get_source_map(
    pool: &SqlitePool,
    project: &str,
    release: &str,
    file_url: &str,
) -> sqlx::Result<Option<SourceMapRow>> {
    sqlx::query_as::<_, SourceMapRow>(
        "SELECT * FROM source_maps WHERE project = ? AND release = ? AND file_url = ?",
    )
    .bind(project)
    .bind(release)
    .bind(file_url)
    .fetch_optional(pool)
    .await
}
