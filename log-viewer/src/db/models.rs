//! Database Models

use sqlx::FromRow;

/// One reassembled log entry.
#[derive(Debug, Clone, FromRow)]
pub struct LogEntry {
    pub id: i64,
    pub ts: i64,
    pub container: String,
    pub stream: String,
    pub level: String,
    pub message: String,
    pub raw: Option<Vec<u8>>,
}

/// Entry fields prior to insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogEntry {
    pub ts: i64,
    pub container: String,
    pub stream: String,
    pub level: String,
    pub message: String,
}

/// Resumable tail position for one container. `(inode, offset)` identify
/// the position; an inode change means the file rotated.
#[derive(Debug, Clone, FromRow)]
pub struct LogCursor {
    pub container: String,
    pub path: String,
    pub offset: i64,
    pub inode: i64,
    pub updated_at: i64,
}
