//! Metrics API
//!
//! Batch ingest, aggregate queries, name enumeration, and the dashboard
//! projection.

pub mod dashboard;
pub mod handlers;
pub mod types;
