//! Log Query API
//!
//! Filtered search over the ring buffer, container and stats projections,
//! and the SSE live tail.

pub mod handlers;
pub mod sse;
pub mod types;
