//! Metrics Collector Configuration
//!
//! Loads configuration from environment variables.

use anyhow::{Context, Result};
use std::env;

/// Metrics Collector configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default "0.0.0.0:5012")
    pub bind_address: String,

    /// SQLite database file path
    pub database_path: String,

    /// Server API key (required)
    pub api_key: String,

    /// Hours of raw points to keep
    pub retention_raw_hours: i64,

    /// Hours of minute aggregates to keep
    pub retention_minute_hours: i64,

    /// Days of hour aggregates to keep
    pub retention_hourly_days: i64,

    /// Seconds between aggregation cycles
    pub aggregation_interval: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:5012".into()),
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "monlight-metrics.db".into()),
            api_key: env::var("API_KEY").context("API_KEY must be set")?,
            retention_raw_hours: env::var("RETENTION_RAW")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
            retention_minute_hours: env::var("RETENTION_MINUTE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(24),
            retention_hourly_days: env::var("RETENTION_HOURLY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            aggregation_interval: env::var("AGGREGATION_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        })
    }

    /// Create a default configuration for testing.
    #[must_use]
    pub fn default_for_test(database_path: String) -> Self {
        Self {
            bind_address: "127.0.0.1:0".into(),
            database_path,
            api_key: "test-key".into(),
            retention_raw_hours: 1,
            retention_minute_hours: 24,
            retention_hourly_days: 30,
            aggregation_interval: 60,
        }
    }
}
