//! Monlight Shared Service Chassis
//!
//! Cross-cutting plumbing used by all four Monlight services: sliding-window
//! rate limiting, API-key authentication, request body gating, SQLite pool
//! construction with the `_meta` migration runner, the shared API error
//! taxonomy, the `Notifier` alert sink, and timestamp helpers.

pub mod auth;
pub mod body_limit;
pub mod db;
pub mod error;
pub mod healthcheck;
pub mod notify;
pub mod ratelimit;
pub mod time;

pub use error::ApiError;
pub use notify::Notifier;
pub use ratelimit::RateLimiter;
