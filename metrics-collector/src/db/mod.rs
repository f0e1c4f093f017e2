//! Database Layer
//!
//! SQLite store for raw metric points and tiered aggregates.

mod models;
mod queries;

pub use models::*;
pub use queries::*;

/// Ordered migration batches applied by the `_meta` runner at startup.
pub const MIGRATIONS: &[&str] = &[
    // 1: raw points and aggregates
    "CREATE TABLE raw_metrics (
         id INTEGER PRIMARY KEY AUTOINCREMENT,
         ts INTEGER NOT NULL,
         name TEXT NOT NULL,
         labels TEXT,
         value REAL NOT NULL,
         metric_type TEXT NOT NULL
     );
     CREATE INDEX idx_raw_ts ON raw_metrics (ts);
     CREATE INDEX idx_raw_name_ts ON raw_metrics (name, ts);

     CREATE TABLE aggregated_metrics (
         id INTEGER PRIMARY KEY AUTOINCREMENT,
         bucket INTEGER NOT NULL,
         resolution TEXT NOT NULL,
         name TEXT NOT NULL,
         labels TEXT,
         metric_type TEXT NOT NULL,
         count INTEGER NOT NULL,
         sum REAL NOT NULL,
         min REAL NOT NULL,
         max REAL NOT NULL,
         avg REAL NOT NULL,
         p50 REAL,
         p95 REAL,
         p99 REAL
     );
     CREATE INDEX idx_agg_lookup ON aggregated_metrics (name, resolution, bucket);
     CREATE INDEX idx_agg_bucket ON aggregated_metrics (resolution, bucket);",
];
