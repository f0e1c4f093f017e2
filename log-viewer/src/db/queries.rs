//! Database Queries

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::models::{LogCursor, LogEntry, NewLogEntry};

/// Insert a batch of reassembled entries in one transaction. The FTS mirror
/// is maintained by the insert trigger.
pub async fn insert_entries(pool: &SqlitePool, entries: &[NewLogEntry]) -> sqlx::Result<()> {
    if entries.is_empty() {
        return Ok(());
    }
    let mut tx = pool.begin().await?;
    for entry in entries {
        sqlx::query(
            "INSERT INTO log_entries (ts, container, stream, level, message, raw)
             VALUES (?, ?, ?, ?, ?, NULL)",
        )
        .bind(entry.ts)
        .bind(&entry.container)
        .bind(&entry.stream)
        .bind(&entry.level)
        .bind(&entry.message)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Prune the ring buffer down to `max_entries`, oldest ids first. A count of
/// exactly `max_entries` deletes nothing. The FTS mirror follows via the
/// delete trigger.
pub async fn prune_to_max(pool: &SqlitePool, max_entries: i64) -> sqlx::Result<u64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM log_entries")
        .fetch_one(pool)
        .await?;
    if count <= max_entries {
        return Ok(0);
    }
    let excess = count - max_entries;
    let result = sqlx::query(
        "DELETE FROM log_entries WHERE id IN (
             SELECT id FROM log_entries ORDER BY id ASC LIMIT ?
         )",
    )
    .bind(excess)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Fetch the saved cursor for a container.
pub async fn get_cursor(pool: &SqlitePool, container: &str) -> sqlx::Result<Option<LogCursor>> {
    sqlx::query_as::<_, LogCursor>("SELECT * FROM log_cursors WHERE container = ?")
        .bind(container)
        .fetch_optional(pool)
        .await
}

/// Persist the tail position for a container.
pub async fn upsert_cursor(
    pool: &SqlitePool,
    container: &str,
    path: &str,
    offset: i64,
    inode: i64,
    now: i64,
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO log_cursors (container, path, offset, inode, updated_at)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(container) DO UPDATE SET
             path = excluded.path,
             offset = excluded.offset,
             inode = excluded.inode,
             updated_at = excluded.updated_at",
    )
    .bind(container)
    .bind(path)
    .bind(offset)
    .bind(inode)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

/// Filters for the log query endpoint.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub container: Option<String>,
    pub level: Option<String>,
    pub search: Option<String>,
    pub since: Option<i64>,
    pub until: Option<i64>,
    pub limit: i64,
    pub offset: i64,
}

/// Query entries, newest first. `search` goes through the FTS5 index.
pub async fn query_entries(pool: &SqlitePool, filter: &LogFilter) -> sqlx::Result<Vec<LogEntry>> {
    let mut qb: QueryBuilder<'_, Sqlite> =
        QueryBuilder::new("SELECT e.* FROM log_entries e WHERE 1 = 1");
    if let Some(container) = &filter.container {
        qb.push(" AND e.container = ").push_bind(container.clone());
    }
    if let Some(level) = &filter.level {
        qb.push(" AND e.level = ").push_bind(level.clone());
    }
    if let Some(search) = &filter.search {
        qb.push(
            " AND e.id IN (SELECT rowid FROM log_entries_fts WHERE log_entries_fts MATCH ",
        )
        .push_bind(search.clone())
        .push(")");
    }
    if let Some(since) = filter.since {
        qb.push(" AND e.ts >= ").push_bind(since);
    }
    if let Some(until) = filter.until {
        qb.push(" AND e.ts <= ").push_bind(until);
    }
    qb.push(" ORDER BY e.ts DESC, e.id DESC LIMIT ")
        .push_bind(filter.limit)
        .push(" OFFSET ")
        .push_bind(filter.offset);

    qb.build_query_as::<LogEntry>().fetch_all(pool).await
}

/// Entries with id greater than `after`, ascending. Feeds the live tail.
pub async fn entries_after(
    pool: &SqlitePool,
    after: i64,
    container: Option<&str>,
    level: Option<&str>,
    limit: i64,
) -> sqlx::Result<Vec<LogEntry>> {
    let mut qb: QueryBuilder<'_, Sqlite> =
        QueryBuilder::new("SELECT * FROM log_entries WHERE id > ");
    qb.push_bind(after);
    if let Some(container) = container {
        qb.push(" AND container = ").push_bind(container.to_owned());
    }
    if let Some(level) = level {
        qb.push(" AND level = ").push_bind(level.to_owned());
    }
    qb.push(" ORDER BY id ASC LIMIT ").push_bind(limit);
    qb.build_query_as::<LogEntry>().fetch_all(pool).await
}

/// Highest assigned entry id, or 0 for an empty store.
pub async fn max_entry_id(pool: &SqlitePool) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) FROM log_entries")
        .fetch_one(pool)
        .await
}

/// Total entry count.
pub async fn count_entries(pool: &SqlitePool) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM log_entries")
        .fetch_one(pool)
        .await
}

/// Watched containers with their entry counts, ascending by name.
pub async fn list_containers(pool: &SqlitePool) -> sqlx::Result<Vec<(String, i64)>> {
    sqlx::query_as(
        "SELECT container, COUNT(*) FROM log_entries GROUP BY container ORDER BY container ASC",
    )
    .fetch_all(pool)
    .await
}

/// Aggregate statistics over the ring buffer.
#[derive(Debug, Clone)]
pub struct LogStats {
    pub total: i64,
    pub oldest: Option<i64>,
    pub newest: Option<i64>,
    pub by_level: Vec<(String, i64)>,
    pub by_container: Vec<(String, i64)>,
}

pub async fn stats(pool: &SqlitePool) -> sqlx::Result<LogStats> {
    let (total, oldest, newest): (i64, Option<i64>, Option<i64>) =
        sqlx::query_as("SELECT COUNT(*), MIN(ts), MAX(ts) FROM log_entries")
            .fetch_one(pool)
            .await?;
    let by_level = sqlx::query_as(
        "SELECT level, COUNT(*) FROM log_entries GROUP BY level ORDER BY level ASC",
    )
    .fetch_all(pool)
    .await?;
    let by_container = list_containers(pool).await?;
    Ok(LogStats {
        total,
        oldest,
        newest,
        by_level,
        by_container,
    })
}

/// FTS rows mirroring a given entry id. Exposed for consistency checks.
pub async fn fts_rows_for(pool: &SqlitePool, id: i64) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM log_entries_fts WHERE rowid = ?")
        .bind(id)
        .fetch_one(pool)
        .await
}
