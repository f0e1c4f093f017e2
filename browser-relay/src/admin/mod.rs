//! Admin API
//!
//! API-key gated management of DSN keys and source maps.

pub mod handlers;
pub mod types;
