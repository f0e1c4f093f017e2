//! Database Queries
//!
//! All writes run inside short transactions so a storage failure leaves no
//! partial state.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::models::{ErrorGroup, Occurrence};

/// Occurrences kept per group; the ring prune deletes the oldest beyond this.
pub const OCCURRENCE_RING: i64 = 5;

/// Validated report fields ready for persistence.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub project: String,
    pub environment: String,
    pub exception_type: String,
    pub message: String,
    pub traceback: String,
    pub request_url: Option<String>,
    pub request_method: Option<String>,
    pub request_headers: Option<String>,
    pub user_id: Option<String>,
    pub extra: Option<String>,
}

/// Which branch the ingest upsert took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Created,
    Incremented,
    Reopened,
}

impl IngestOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Incremented => "incremented",
            Self::Reopened => "reopened",
        }
    }
}

/// Upsert a report into its fingerprint group and append an occurrence.
///
/// Branch order: unresolved group (increment), resolved group (reopen),
/// neither (create). The occurrence ring is pruned to [`OCCURRENCE_RING`]
/// rows, oldest first (timestamp ASC, id ASC). Returns the branch taken,
/// the group id, and the new count.
pub async fn ingest(
    pool: &SqlitePool,
    fingerprint: &str,
    report: &NewReport,
    now: i64,
) -> sqlx::Result<(IngestOutcome, i64, i64)> {
    let mut tx = pool.begin().await?;

    let unresolved: Option<(i64, i64)> = sqlx::query_as(
        "SELECT id, count FROM error_groups WHERE fingerprint = ? AND resolved = 0 LIMIT 1",
    )
    .bind(fingerprint)
    .fetch_optional(&mut *tx)
    .await?;

    let (outcome, group_id, count) = if let Some((id, count)) = unresolved {
        sqlx::query("UPDATE error_groups SET count = count + 1, last_seen = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        (IngestOutcome::Incremented, id, count + 1)
    } else {
        let resolved: Option<(i64, i64)> = sqlx::query_as(
            "SELECT id, count FROM error_groups WHERE fingerprint = ? AND resolved = 1
             ORDER BY resolved_at DESC LIMIT 1",
        )
        .bind(fingerprint)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some((id, count)) = resolved {
            sqlx::query(
                "UPDATE error_groups
                 SET resolved = 0, resolved_at = NULL, count = count + 1, last_seen = ?
                 WHERE id = ?",
            )
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
            (IngestOutcome::Reopened, id, count + 1)
        } else {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO error_groups
                     (fingerprint, project, environment, exception_type, message, traceback,
                      count, first_seen, last_seen)
                 VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)
                 RETURNING id",
            )
            .bind(fingerprint)
            .bind(&report.project)
            .bind(&report.environment)
            .bind(&report.exception_type)
            .bind(&report.message)
            .bind(&report.traceback)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
            (IngestOutcome::Created, id, 1)
        }
    };

    sqlx::query(
        "INSERT INTO error_occurrences
             (group_id, ts, request_url, request_method, request_headers, user_id, extra, traceback)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(group_id)
    .bind(now)
    .bind(&report.request_url)
    .bind(&report.request_method)
    .bind(&report.request_headers)
    .bind(&report.user_id)
    .bind(&report.extra)
    .bind(&report.traceback)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "DELETE FROM error_occurrences
         WHERE group_id = ?
           AND id NOT IN (
               SELECT id FROM error_occurrences WHERE group_id = ?
               ORDER BY ts DESC, id DESC LIMIT ?
           )",
    )
    .bind(group_id)
    .bind(group_id)
    .bind(OCCURRENCE_RING)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok((outcome, group_id, count))
}

/// Occurrence-source filter: browser-originated reports carry the sentinel
/// request method `BROWSER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFilter {
    Browser,
    Server,
}

/// Filters for the group listing.
#[derive(Debug, Clone, Default)]
pub struct GroupFilter {
    pub project: Option<String>,
    pub environment: Option<String>,
    pub resolved: bool,
    pub source: Option<SourceFilter>,
    pub session_id: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

fn push_group_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &GroupFilter) {
    qb.push(" WHERE g.resolved = ").push_bind(filter.resolved);
    if let Some(project) = &filter.project {
        qb.push(" AND g.project = ").push_bind(project.clone());
    }
    if let Some(environment) = &filter.environment {
        qb.push(" AND g.environment = ").push_bind(environment.clone());
    }
    match filter.source {
        Some(SourceFilter::Browser) => {
            qb.push(
                " AND EXISTS (SELECT 1 FROM error_occurrences o
                   WHERE o.group_id = g.id AND o.request_method = 'BROWSER')",
            );
        }
        Some(SourceFilter::Server) => {
            qb.push(
                " AND NOT EXISTS (SELECT 1 FROM error_occurrences o
                   WHERE o.group_id = g.id AND o.request_method = 'BROWSER')",
            );
        }
        None => {}
    }
    if let Some(session_id) = &filter.session_id {
        qb.push(
            " AND EXISTS (SELECT 1 FROM error_occurrences o
               WHERE o.group_id = g.id AND json_extract(o.extra, '$.session_id') = ",
        )
        .push_bind(session_id.clone())
        .push(")");
    }
}

/// List groups matching the filter, most recently seen first, plus the total
/// match count for pagination.
pub async fn list_groups(
    pool: &SqlitePool,
    filter: &GroupFilter,
) -> sqlx::Result<(Vec<ErrorGroup>, i64)> {
    let mut count_qb: QueryBuilder<'_, Sqlite> =
        QueryBuilder::new("SELECT COUNT(*) FROM error_groups g");
    push_group_filters(&mut count_qb, filter);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("SELECT g.* FROM error_groups g");
    push_group_filters(&mut qb, filter);
    qb.push(" ORDER BY g.last_seen DESC, g.id DESC LIMIT ")
        .push_bind(filter.limit)
        .push(" OFFSET ")
        .push_bind(filter.offset);
    let groups = qb.build_query_as::<ErrorGroup>().fetch_all(pool).await?;

    Ok((groups, total))
}

/// Fetch one group by id.
pub async fn get_group(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<ErrorGroup>> {
    sqlx::query_as::<_, ErrorGroup>("SELECT * FROM error_groups WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// The group's retained occurrences, newest first.
pub async fn recent_occurrences(pool: &SqlitePool, group_id: i64) -> sqlx::Result<Vec<Occurrence>> {
    sqlx::query_as::<_, Occurrence>(
        "SELECT * FROM error_occurrences WHERE group_id = ?
         ORDER BY ts DESC, id DESC LIMIT ?",
    )
    .bind(group_id)
    .bind(OCCURRENCE_RING)
    .fetch_all(pool)
    .await
}

/// Mark a group resolved. Idempotent: an already-resolved group keeps its
/// original `resolved_at`. Returns the group as stored, or `None` when the
/// id is unknown.
pub async fn resolve_group(
    pool: &SqlitePool,
    id: i64,
    now: i64,
) -> sqlx::Result<Option<ErrorGroup>> {
    sqlx::query("UPDATE error_groups SET resolved = 1, resolved_at = ? WHERE id = ? AND resolved = 0")
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    get_group(pool, id).await
}

/// Distinct project names, ascending.
pub async fn list_projects(pool: &SqlitePool) -> sqlx::Result<Vec<String>> {
    sqlx::query_scalar("SELECT DISTINCT project FROM error_groups ORDER BY project ASC")
        .fetch_all(pool)
        .await
}

/// Delete resolved groups whose `resolved_at` predates the cutoff.
/// Occurrences cascade. Unresolved groups are never aged out.
pub async fn sweep_resolved(pool: &SqlitePool, cutoff: i64) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM error_groups WHERE resolved = 1 AND resolved_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Total group count, reported by `/health`.
pub async fn count_groups(pool: &SqlitePool) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM error_groups")
        .fetch_one(pool)
        .await
}

/// Occurrence count for one group.
pub async fn count_occurrences(pool: &SqlitePool, group_id: i64) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM error_occurrences WHERE group_id = ?")
        .bind(group_id)
        .fetch_one(pool)
        .await
}
