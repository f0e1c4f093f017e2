//! Request/Response Types

use mon_common::time::fmt_ts;
use serde::{Deserialize, Serialize};

use crate::db::{LogEntry, LogStats};

/// Log query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct LogQueryParams {
    pub container: Option<String>,
    pub level: Option<String>,
    /// FTS5 MATCH expression over the message text.
    pub search: Option<String>,
    /// ISO-8601 lower bound (inclusive).
    pub since: Option<String>,
    /// ISO-8601 upper bound (inclusive).
    pub until: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Live-tail parameters: a subset of the query filters.
#[derive(Debug, Default, Deserialize)]
pub struct TailParams {
    pub container: Option<String>,
    pub level: Option<String>,
}

/// Entry as rendered on the API.
#[derive(Debug, Serialize)]
pub struct LogEntryView {
    pub id: i64,
    pub timestamp: String,
    pub container: String,
    pub stream: String,
    pub level: String,
    pub message: String,
}

impl From<LogEntry> for LogEntryView {
    fn from(e: LogEntry) -> Self {
        Self {
            id: e.id,
            timestamp: fmt_ts(e.ts),
            container: e.container,
            stream: e.stream,
            level: e.level,
            message: e.message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub logs: Vec<LogEntryView>,
}

#[derive(Debug, Serialize)]
pub struct ContainerInfo {
    pub container: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total: i64,
    pub oldest: Option<String>,
    pub newest: Option<String>,
    pub by_level: Vec<LevelCount>,
    pub by_container: Vec<ContainerInfo>,
}

#[derive(Debug, Serialize)]
pub struct LevelCount {
    pub level: String,
    pub count: i64,
}

impl From<LogStats> for StatsResponse {
    fn from(s: LogStats) -> Self {
        Self {
            total: s.total,
            oldest: s.oldest.map(fmt_ts),
            newest: s.newest.map(fmt_ts),
            by_level: s
                .by_level
                .into_iter()
                .map(|(level, count)| LevelCount { level, count })
                .collect(),
            by_container: s
                .by_container
                .into_iter()
                .map(|(container, count)| ContainerInfo { container, count })
                .collect(),
        }
    }
}
