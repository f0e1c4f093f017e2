//! Browser-Facing Endpoints
//!
//! DSN-key validated submission paths that transform and forward payloads
//! to the internal services.

pub mod forward;
pub mod handlers;
pub mod types;
