//! Error Tracker Configuration
//!
//! Loads configuration from environment variables.

use anyhow::{Context, Result};
use std::env;

/// Error Tracker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default "0.0.0.0:5010")
    pub bind_address: String,

    /// SQLite database file path
    pub database_path: String,

    /// Server API key (required)
    pub api_key: String,

    /// Days to keep resolved groups before the retention sweep deletes them
    pub retention_days: i64,

    /// Postmark server token (alerting disabled when unset)
    pub postmark_api_token: Option<String>,

    /// Sender address for alert email
    pub postmark_from_email: Option<String>,

    /// Alert recipients (comma-separated)
    pub alert_emails: Vec<String>,

    /// Public base URL used in alert deep links
    pub base_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:5010".into()),
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "monlight-errors.db".into()),
            api_key: env::var("API_KEY").context("API_KEY must be set")?,
            retention_days: env::var("RETENTION_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(90),
            postmark_api_token: env::var("POSTMARK_API_TOKEN").ok(),
            postmark_from_email: env::var("POSTMARK_FROM_EMAIL").ok(),
            alert_emails: env::var("ALERT_EMAILS")
                .map(|s| {
                    s.split(',')
                        .map(|e| e.trim().to_string())
                        .filter(|e| !e.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            base_url: env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:5010".into()),
        })
    }

    /// Check if Postmark alerting is fully configured.
    #[must_use]
    pub const fn has_alerting(&self) -> bool {
        self.postmark_api_token.is_some() && self.postmark_from_email.is_some()
    }

    /// Create a default configuration for testing.
    #[must_use]
    pub fn default_for_test(database_path: String) -> Self {
        Self {
            bind_address: "127.0.0.1:0".into(),
            database_path,
            api_key: "test-key".into(),
            retention_days: 90,
            postmark_api_token: None,
            postmark_from_email: None,
            alert_emails: vec!["ops@example.com".into()],
            base_url: "http://localhost:5010".into(),
        }
    }
}
