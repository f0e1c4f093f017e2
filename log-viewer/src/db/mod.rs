//! Database Layer
//!
//! SQLite store for log entries (with an FTS5 mirror kept in lockstep via
//! triggers) and per-container tail cursors.

mod models;
mod queries;

pub use models::*;
pub use queries::*;

/// Ordered migration batches applied by the `_meta` runner at startup.
pub const MIGRATIONS: &[&str] = &[
    // 1: entries, full-text mirror, cursors
    "CREATE TABLE log_entries (
         id INTEGER PRIMARY KEY AUTOINCREMENT,
         ts INTEGER NOT NULL,
         container TEXT NOT NULL,
         stream TEXT NOT NULL,
         level TEXT NOT NULL,
         message TEXT NOT NULL,
         raw BLOB
     );
     CREATE INDEX idx_entries_ts ON log_entries (ts, id);
     CREATE INDEX idx_entries_container ON log_entries (container, ts);

     CREATE VIRTUAL TABLE log_entries_fts USING fts5(message);

     CREATE TRIGGER log_entries_ai AFTER INSERT ON log_entries BEGIN
         INSERT INTO log_entries_fts (rowid, message) VALUES (new.id, new.message);
     END;
     CREATE TRIGGER log_entries_ad AFTER DELETE ON log_entries BEGIN
         DELETE FROM log_entries_fts WHERE rowid = old.id;
     END;

     CREATE TABLE log_cursors (
         container TEXT PRIMARY KEY,
         path TEXT NOT NULL,
         offset INTEGER NOT NULL,
         inode INTEGER NOT NULL,
         updated_at INTEGER NOT NULL
     );",
];
