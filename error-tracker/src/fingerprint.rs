//! Error Fingerprinting
//!
//! A report's fingerprint is the MD5 of `project:exception_type:file:line`,
//! where `file:line` is the innermost (last) Python traceback location, or
//! failing that the first JavaScript stack frame. Column numbers are
//! excluded so minifier churn within a line does not split groups. When no
//! location parses at all, the whole traceback stands in for `file:line` so
//! the fingerprint stays deterministic.

use std::sync::LazyLock;

use regex::Regex;

/// Python: `File "/app/x.py", line 56, in handler`
static PY_LOCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"File "([^"]+)", line (\d+)"#).expect("static regex"));

/// Chrome: `    at handler (https://app.example.com/bundle.js:12:34)`
/// and the bare form `    at https://app.example.com/bundle.js:12:34`
static CHROME_FRAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*at\s+(?:.*?\()?(.+?):(\d+):(\d+)\)?\s*$").expect("static regex")
});

/// Firefox: `handler@https://app.example.com/bundle.js:12:34`
static FIREFOX_FRAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*?@(.+?):(\d+):(\d+)\s*$").expect("static regex"));

/// Extract the grouping location from a traceback.
///
/// Python locations win, last match first (the innermost frame); otherwise
/// the first JavaScript frame in either Chrome or Firefox format.
pub fn parse_location(traceback: &str) -> Option<(String, String)> {
    if let Some(caps) = PY_LOCATION.captures_iter(traceback).last() {
        return Some((caps[1].to_owned(), caps[2].to_owned()));
    }

    for line in traceback.lines() {
        if let Some(caps) = CHROME_FRAME
            .captures(line)
            .or_else(|| FIREFOX_FRAME.captures(line))
        {
            return Some((caps[1].to_owned(), caps[2].to_owned()));
        }
    }

    None
}

/// Compute the 32-char lowercase hex fingerprint for a report.
pub fn fingerprint(project: &str, exception_type: &str, traceback: &str) -> String {
    let input = match parse_location(traceback) {
        Some((file, line)) => format!("{project}:{exception_type}:{file}:{line}"),
        None => format!("{project}:{exception_type}:{traceback}"),
    };
    format!("{:x}", md5::compute(input.as_bytes()))
}
