//! Docker Log Source Layout
//!
//! Containers live under the log-source root as one directory per container
//! id, holding `config.v2.json` (metadata, including the container name) and
//! `<id>-json.log` (one JSON envelope per line).

use std::fs;
use std::path::{Path, PathBuf};

use mon_common::time::parse_ts;
use serde::Deserialize;
use tracing::debug;

/// One line of the Docker JSON log format.
#[derive(Debug, Deserialize)]
struct Envelope {
    log: String,
    stream: String,
    time: String,
}

/// A decoded log line: text (trailing newline stripped), stream, and the
/// source timestamp as epoch seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLine {
    pub text: String,
    pub stream: String,
    pub ts: i64,
}

/// Decode one Docker JSON log line. Returns `None` for lines that are not
/// valid envelopes (torn writes, unrelated files).
pub fn decode_line(line: &str, fallback_ts: i64) -> Option<DecodedLine> {
    let envelope: Envelope = serde_json::from_str(line).ok()?;
    let mut text = envelope.log;
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    Some(DecodedLine {
        text,
        stream: envelope.stream,
        ts: parse_ts(&envelope.time).unwrap_or(fallback_ts),
    })
}

#[derive(Debug, Deserialize)]
struct ContainerMeta {
    #[serde(rename = "Name")]
    name: Option<String>,
}

/// Scan the log-source root for the directory whose metadata names the
/// container, and return its JSON log file path.
pub fn discover_log_file(root: &str, container: &str) -> Option<PathBuf> {
    let entries = fs::read_dir(root).ok()?;
    let wanted = format!("/{container}");

    for entry in entries.flatten() {
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }
        if !matches_container(&dir, container, &wanted) {
            continue;
        }
        let dir_name = dir.file_name()?.to_str()?.to_owned();
        let log_file = dir.join(format!("{dir_name}-json.log"));
        debug!(container = %container, path = %log_file.display(), "Discovered container log file");
        return Some(log_file);
    }
    None
}

fn matches_container(dir: &Path, container: &str, wanted: &str) -> bool {
    let meta_path = dir.join("config.v2.json");
    let Ok(contents) = fs::read_to_string(&meta_path) else {
        return false;
    };
    let Ok(meta) = serde_json::from_str::<ContainerMeta>(&contents) else {
        return false;
    };
    meta.name
        .as_deref()
        .is_some_and(|name| name == wanted || name == container)
}
