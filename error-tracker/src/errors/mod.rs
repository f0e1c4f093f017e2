//! Error Group API
//!
//! Ingest, listing, detail, resolve, and project enumeration.

pub mod alerts;
pub mod handlers;
pub mod types;
