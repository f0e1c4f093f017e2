//! Monlight Metrics Collector
//!
//! Accepts raw metric points, rolls them into minute and hour aggregates
//! (with nearest-rank percentiles for histograms), applies tiered retention,
//! and serves queries with automatic resolution selection.

pub mod api;
pub mod config;
pub mod db;
pub mod metrics;
pub mod rollup;
