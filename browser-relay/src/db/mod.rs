//! Database Layer
//!
//! SQLite store for DSN keys and uploaded source maps.

mod models;
mod queries;

pub use models::*;
pub use queries::*;

/// Ordered migration batches applied by the `_meta` runner at startup.
pub const MIGRATIONS: &[&str] = &[
    // 1: DSN keys and source maps
    "CREATE TABLE dsn_keys (
         id INTEGER PRIMARY KEY AUTOINCREMENT,
         key TEXT NOT NULL UNIQUE,
         project TEXT NOT NULL,
         active INTEGER NOT NULL DEFAULT 1,
         created_at INTEGER NOT NULL
     );

     CREATE TABLE source_maps (
         id INTEGER PRIMARY KEY AUTOINCREMENT,
         project TEXT NOT NULL,
         release TEXT NOT NULL,
         file_url TEXT NOT NULL,
         content TEXT NOT NULL,
         uploaded_at INTEGER NOT NULL,
         UNIQUE (project, release, file_url)
     );",
];
