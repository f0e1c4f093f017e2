//! Source-Map Deobfuscation
//!
//! Decodes standard source-map v3 `mappings` (semicolon-separated generated
//! lines, comma-separated base64-VLQ segments) and rewrites minified stack
//! frames back to original file/line/column positions.

pub mod rewrite;
pub mod vlq;

pub use rewrite::{normalize_frame_url, MapLookup, MappingIndex, StackFrame};
