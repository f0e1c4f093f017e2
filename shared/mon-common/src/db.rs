//! SQLite Store Construction
//!
//! Each Monlight service owns one embedded SQLite database. Pools are opened
//! in WAL mode so readers never block the single writer, with a busy timeout
//! to absorb short write contention. Schema evolution goes through the
//! `_meta` migration runner: a service declares an ordered list of migration
//! batches and the runner applies whatever the store has not seen yet.

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

/// Open (creating if necessary) the service's SQLite store.
pub async fn create_pool(path: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await
        .with_context(|| format!("failed to open SQLite store at {path}"))?;

    info!(path, "Opened SQLite store");
    Ok(pool)
}

/// Apply any migrations the store has not seen yet.
///
/// The `_meta` table holds the ordinal of the last applied migration batch
/// (1-based index into `migrations`). All outstanding batches run inside a
/// single transaction, so a failed upgrade leaves the store at its previous
/// version. Calling this with an unchanged list is a no-op.
pub async fn run_migrations(pool: &SqlitePool, migrations: &[&str]) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS _meta (
             id INTEGER PRIMARY KEY CHECK (id = 1),
             version INTEGER NOT NULL
         )",
    )
    .execute(&mut *tx)
    .await?;

    let current: i64 = sqlx::query_scalar("SELECT version FROM _meta WHERE id = 1")
        .fetch_optional(&mut *tx)
        .await?
        .unwrap_or(0);

    let target = migrations.len() as i64;
    if current >= target {
        tx.commit().await?;
        return Ok(());
    }

    for (idx, batch) in migrations.iter().enumerate() {
        let ordinal = idx as i64 + 1;
        if ordinal <= current {
            continue;
        }
        sqlx::raw_sql(batch)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("migration {ordinal} failed"))?;
    }

    sqlx::query(
        "INSERT INTO _meta (id, version) VALUES (1, ?)
         ON CONFLICT(id) DO UPDATE SET version = excluded.version",
    )
    .bind(target)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    info!(from = current, to = target, "Database migrations completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_pool() -> (tempfile::TempDir, SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let pool = create_pool(path.to_str().unwrap()).await.unwrap();
        (dir, pool)
    }

    #[tokio::test]
    async fn applies_migrations_in_order() {
        let (_dir, pool) = temp_pool().await;
        let migrations = [
            "CREATE TABLE a (id INTEGER PRIMARY KEY);",
            "CREATE TABLE b (id INTEGER PRIMARY KEY);
             INSERT INTO a (id) VALUES (1);",
        ];
        run_migrations(&pool, &migrations).await.unwrap();

        let version: i64 = sqlx::query_scalar("SELECT version FROM _meta WHERE id = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(version, 2);

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM a")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn rerun_is_idempotent() {
        let (_dir, pool) = temp_pool().await;
        let migrations = ["CREATE TABLE a (id INTEGER PRIMARY KEY);"];
        run_migrations(&pool, &migrations).await.unwrap();
        // A second run must not attempt to re-create the table.
        run_migrations(&pool, &migrations).await.unwrap();
    }

    #[tokio::test]
    async fn applies_only_new_batches_on_upgrade() {
        let (_dir, pool) = temp_pool().await;
        let v1 = ["CREATE TABLE a (id INTEGER PRIMARY KEY);"];
        run_migrations(&pool, &v1).await.unwrap();

        let v2 = [
            "CREATE TABLE a (id INTEGER PRIMARY KEY);",
            "ALTER TABLE a ADD COLUMN name TEXT;",
        ];
        run_migrations(&pool, &v2).await.unwrap();

        sqlx::query("INSERT INTO a (id, name) VALUES (1, 'x')")
            .execute(&pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn failed_batch_rolls_back() {
        let (_dir, pool) = temp_pool().await;
        let bad = [
            "CREATE TABLE a (id INTEGER PRIMARY KEY);",
            "THIS IS NOT SQL;",
        ];
        assert!(run_migrations(&pool, &bad).await.is_err());

        // The whole transaction rolled back, including the first batch.
        let applied: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'a'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(applied, 0);
    }
}
