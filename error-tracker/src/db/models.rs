//! Database Models

use sqlx::FromRow;

/// One deduplicated error group. At most one unresolved group exists per
/// fingerprint; a resolved group with the same fingerprint may coexist until
/// reopen logic folds the recurrence back into it.
#[derive(Debug, Clone, FromRow)]
pub struct ErrorGroup {
    pub id: i64,
    pub fingerprint: String,
    pub project: String,
    pub environment: String,
    pub exception_type: String,
    pub message: String,
    pub traceback: String,
    pub count: i64,
    pub first_seen: i64,
    pub last_seen: i64,
    pub resolved: bool,
    pub resolved_at: Option<i64>,
}

/// One submitted report, owned by exactly one group.
#[derive(Debug, Clone, FromRow)]
pub struct Occurrence {
    pub id: i64,
    pub group_id: i64,
    pub ts: i64,
    pub request_url: Option<String>,
    pub request_method: Option<String>,
    pub request_headers: Option<String>,
    pub user_id: Option<String>,
    pub extra: Option<String>,
    pub traceback: String,
}
