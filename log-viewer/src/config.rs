//! Log Viewer Configuration
//!
//! Loads configuration from environment variables.

use anyhow::{Context, Result};
use std::env;

/// Log Viewer configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default "0.0.0.0:5011")
    pub bind_address: String,

    /// SQLite database file path
    pub database_path: String,

    /// Server API key (required)
    pub api_key: String,

    /// Containers to watch (required, comma-separated)
    pub containers: Vec<String>,

    /// Root directory holding per-container log directories
    pub log_sources: String,

    /// Ring-buffer capacity; excess entries are pruned oldest-first
    pub max_entries: i64,

    /// Seconds between tail polls
    pub poll_interval: u64,

    /// Bytes replayed from the end of a file on first contact
    pub tail_buffer: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let containers: Vec<String> = env::var("CONTAINERS")
            .context("CONTAINERS must be set")?
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if containers.is_empty() {
            anyhow::bail!("CONTAINERS must name at least one container");
        }

        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:5011".into()),
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "monlight-logs.db".into()),
            api_key: env::var("API_KEY").context("API_KEY must be set")?,
            containers,
            log_sources: env::var("LOG_SOURCES")
                .unwrap_or_else(|_| "/var/lib/docker/containers".into()),
            max_entries: env::var("MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),
            poll_interval: env::var("POLL_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
            tail_buffer: env::var("TAIL_BUFFER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(64 * 1024),
        })
    }

    /// Create a default configuration for testing.
    #[must_use]
    pub fn default_for_test(database_path: String, log_sources: String) -> Self {
        Self {
            bind_address: "127.0.0.1:0".into(),
            database_path,
            api_key: "test-key".into(),
            containers: vec!["app".into()],
            log_sources,
            max_entries: 10_000,
            poll_interval: 2,
            tail_buffer: 64 * 1024,
        }
    }
}
