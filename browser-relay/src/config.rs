//! Browser Relay Configuration
//!
//! Loads configuration from environment variables.

use anyhow::{Context, Result};
use std::env;

/// Upper bound on configured CORS origins.
const MAX_CORS_ORIGINS: usize = 32;

/// Upper bound on a single origin string.
const MAX_ORIGIN_LEN: usize = 256;

/// Browser Relay configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default "0.0.0.0:5013")
    pub bind_address: String,

    /// SQLite database file path
    pub database_path: String,

    /// Admin API key (required)
    pub admin_api_key: String,

    /// Error Tracker base URL
    pub error_tracker_url: String,

    /// Internal API key for the Error Tracker
    pub error_tracker_api_key: String,

    /// Metrics Collector base URL
    pub metrics_collector_url: String,

    /// Internal API key for the Metrics Collector
    pub metrics_collector_api_key: String,

    /// Exact-match CORS origin allowlist
    pub cors_origins: Vec<String>,

    /// Body cap for browser submissions in bytes (default 64 KiB)
    pub max_body_size: usize,

    /// Requests per minute per client (default 300)
    pub rate_limit: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let cors_origins = parse_origins(&env::var("CORS_ORIGINS").unwrap_or_default())?;

        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:5013".into()),
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "monlight-relay.db".into()),
            admin_api_key: env::var("ADMIN_API_KEY").context("ADMIN_API_KEY must be set")?,
            error_tracker_url: env::var("ERROR_TRACKER_URL")
                .unwrap_or_else(|_| "http://localhost:5010".into()),
            error_tracker_api_key: env::var("ERROR_TRACKER_API_KEY").unwrap_or_default(),
            metrics_collector_url: env::var("METRICS_COLLECTOR_URL")
                .unwrap_or_else(|_| "http://localhost:5012".into()),
            metrics_collector_api_key: env::var("METRICS_COLLECTOR_API_KEY").unwrap_or_default(),
            cors_origins,
            max_body_size: env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(64 * 1024),
            rate_limit: env::var("RATE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
        })
    }

    /// Create a default configuration for testing.
    #[must_use]
    pub fn default_for_test(database_path: String) -> Self {
        Self {
            bind_address: "127.0.0.1:0".into(),
            database_path,
            admin_api_key: "admin-key".into(),
            error_tracker_url: "http://localhost:5010".into(),
            error_tracker_api_key: "internal-key".into(),
            metrics_collector_url: "http://localhost:5012".into(),
            metrics_collector_api_key: "internal-key".into(),
            cors_origins: vec!["http://app.example.com".into()],
            max_body_size: 64 * 1024,
            rate_limit: 300,
        }
    }
}

/// Parse and validate the comma-separated origin allowlist.
fn parse_origins(raw: &str) -> Result<Vec<String>> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();

    if origins.len() > MAX_CORS_ORIGINS {
        anyhow::bail!("CORS_ORIGINS lists more than {MAX_CORS_ORIGINS} origins");
    }
    for origin in &origins {
        if origin.len() > MAX_ORIGIN_LEN {
            anyhow::bail!("CORS origin exceeds {MAX_ORIGIN_LEN} characters: {origin}");
        }
    }
    Ok(origins)
}
