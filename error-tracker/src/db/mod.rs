//! Database Layer
//!
//! SQLite store for error groups and occurrences.

mod models;
mod queries;

pub use models::*;
pub use queries::*;

/// Ordered migration batches applied by the `_meta` runner at startup.
pub const MIGRATIONS: &[&str] = &[
    // 1: initial schema
    "CREATE TABLE error_groups (
         id INTEGER PRIMARY KEY AUTOINCREMENT,
         fingerprint TEXT NOT NULL,
         project TEXT NOT NULL,
         environment TEXT NOT NULL DEFAULT 'prod',
         exception_type TEXT NOT NULL,
         message TEXT NOT NULL,
         traceback TEXT NOT NULL,
         count INTEGER NOT NULL DEFAULT 1,
         first_seen INTEGER NOT NULL,
         last_seen INTEGER NOT NULL,
         resolved INTEGER NOT NULL DEFAULT 0,
         resolved_at INTEGER
     );
     CREATE INDEX idx_groups_fingerprint ON error_groups (fingerprint, resolved);
     CREATE INDEX idx_groups_last_seen ON error_groups (last_seen);

     CREATE TABLE error_occurrences (
         id INTEGER PRIMARY KEY AUTOINCREMENT,
         group_id INTEGER NOT NULL REFERENCES error_groups(id) ON DELETE CASCADE,
         ts INTEGER NOT NULL,
         request_url TEXT,
         request_method TEXT,
         request_headers TEXT,
         user_id TEXT,
         extra TEXT,
         traceback TEXT NOT NULL
     );
     CREATE INDEX idx_occurrences_group ON error_occurrences (group_id, ts, id);",
];
