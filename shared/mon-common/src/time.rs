//! Timestamp helpers.
//!
//! Monlight stores timestamps as INTEGER epoch seconds (second precision by
//! construction) and renders ISO-8601 UTC at the API boundary.

use chrono::{DateTime, Utc};

/// Current time as epoch seconds.
pub fn now() -> i64 {
    Utc::now().timestamp()
}

/// Render an epoch-second timestamp as ISO-8601 UTC (`2026-08-01T12:00:00Z`).
pub fn fmt_ts(epoch: i64) -> String {
    DateTime::<Utc>::from_timestamp(epoch, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_default()
}

/// Parse an RFC 3339 timestamp (with or without fractional seconds) into
/// epoch seconds, discarding anything below second precision.
pub fn parse_ts(s: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.timestamp())
}

/// Start of the minute containing `ts`.
pub const fn minute_bucket(ts: i64) -> i64 {
    ts - ts.rem_euclid(60)
}

/// Start of the hour containing `ts`.
pub const fn hour_bucket(ts: i64) -> i64 {
    ts - ts.rem_euclid(3600)
}
