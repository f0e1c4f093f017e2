//! Log Level Extraction
//!
//! Pure function of the message text and source stream. Probes run in a
//! fixed order: JSON `level` field, bracketed `[LEVEL]`, `level=VALUE`,
//! then a leading `LEVEL:` prefix (covering uvicorn's padded `INFO:    `
//! form). Unmatched messages default by stream: stderr is ERROR, stdout
//! is INFO.

use std::sync::LazyLock;

use regex::Regex;

const TOKENS: &str = "DEBUG|INFO|WARNING|WARN|ERROR|ERR|CRITICAL|CRIT|FATAL";

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)\[({TOKENS})\]")).expect("static regex"));

static KEY_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)\blevel=({TOKENS})\b")).expect("static regex"));

static PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)^({TOKENS})\s*:")).expect("static regex"));

/// Map a recognised token onto the canonical level set.
fn normalize(token: &str) -> Option<&'static str> {
    match token.to_ascii_uppercase().as_str() {
        "DEBUG" => Some("DEBUG"),
        "INFO" => Some("INFO"),
        "WARN" | "WARNING" => Some("WARNING"),
        "ERR" | "ERROR" => Some("ERROR"),
        "CRIT" | "CRITICAL" | "FATAL" => Some("CRITICAL"),
        _ => None,
    }
}

/// Extract the level of a reassembled message.
pub fn extract_level(message: &str, stream: &str) -> &'static str {
    let first_line = message.lines().next().unwrap_or("");

    if first_line.trim_start().starts_with('{') {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(first_line) {
            if let Some(level) = value.get("level").and_then(|l| l.as_str()) {
                if let Some(level) = normalize(level) {
                    return level;
                }
            }
        }
    }

    if let Some(caps) = BRACKETED.captures(first_line) {
        if let Some(level) = normalize(&caps[1]) {
            return level;
        }
    }

    if let Some(caps) = KEY_VALUE.captures(first_line) {
        if let Some(level) = normalize(&caps[1]) {
            return level;
        }
    }

    if let Some(caps) = PREFIX.captures(first_line) {
        if let Some(level) = normalize(&caps[1]) {
            return level;
        }
    }

    if stream == "stderr" {
        "ERROR"
    } else {
        "INFO"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_level_field_wins() {
        assert_eq!(
            extract_level(r#"{"level": "warn", "msg": "slow"}"#, "stdout"),
            "WARNING"
        );
    }

    #[test]
    fn bracketed_level_anywhere_in_line() {
        assert_eq!(extract_level("2024-05-01 [ERROR] it broke", "stdout"), "ERROR");
        assert_eq!(extract_level("[info] fine", "stderr"), "INFO");
    }

    #[test]
    fn key_value_form() {
        assert_eq!(extract_level("ts=1 level=debug msg=x", "stdout"), "DEBUG");
        assert_eq!(extract_level("LEVEL=CRIT something", "stdout"), "CRITICAL");
    }

    #[test]
    fn leading_prefix_including_uvicorn_padding() {
        assert_eq!(extract_level("ERROR: failed", "stdout"), "ERROR");
        assert_eq!(
            extract_level("INFO:     Uvicorn running on http://0.0.0.0:8000", "stdout"),
            "INFO"
        );
        assert_eq!(extract_level("warn: disk almost full", "stdout"), "WARNING");
    }

    #[test]
    fn probe_order_json_beats_bracket() {
        assert_eq!(
            extract_level(r#"{"level": "info", "msg": "[ERROR] quoted"}"#, "stderr"),
            "INFO"
        );
    }

    #[test]
    fn defaults_follow_stream() {
        assert_eq!(extract_level("plain text", "stderr"), "ERROR");
        assert_eq!(extract_level("plain text", "stdout"), "INFO");
    }

    #[test]
    fn fatal_and_aliases_normalize() {
        assert_eq!(extract_level("[FATAL] gone", "stdout"), "CRITICAL");
        assert_eq!(extract_level("[err] oops", "stdout"), "ERROR");
        assert_eq!(extract_level("[warning] hmm", "stdout"), "WARNING");
    }
}
