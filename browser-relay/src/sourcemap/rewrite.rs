//! Stack Frame Rewriting
//!
//! Parses browser stack traces (Chrome and Firefox formats), looks up the
//! matching source map by scheme/host-stripped file URL, and rewrites each
//! frame to its original position. A frame whose map is missing or fails to
//! decode is left untouched; the request as a whole always succeeds.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::vlq::decode_segment;

/// Chrome: `    at handler (https://app.example.com/bundle.js:12:34)` and
/// the bare `    at https://app.example.com/bundle.js:12:34`
static CHROME_FRAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*at\s+(?:.*?\()?(.+?):(\d+):(\d+)\)?\s*$").expect("static regex")
});

/// Firefox: `handler@https://app.example.com/bundle.js:12:34`
static FIREFOX_FRAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*?@(.+?):(\d+):(\d+)\s*$").expect("static regex"));

/// One parsed stack frame (1-based line and column, as browsers report).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

/// Strip scheme and host from a frame URL, leaving the path.
///
/// `https://cdn.example.com/static/app.js` → `/static/app.js`. Inputs
/// without a scheme pass through unchanged.
pub fn normalize_frame_url(url: &str) -> String {
    if let Some(rest) = url.split_once("://").map(|(_, rest)| rest) {
        match rest.find('/') {
            Some(idx) => rest[idx..].to_owned(),
            None => "/".to_owned(),
        }
    } else {
        url.to_owned()
    }
}

/// Parse one stack line into a frame, if it matches a known format.
pub fn parse_frame(line: &str) -> Option<(StackFrame, std::ops::Range<usize>)> {
    let caps = CHROME_FRAME
        .captures(line)
        .or_else(|| FIREFOX_FRAME.captures(line))?;
    let whole = caps.get(1)?.start()..caps.get(3)?.end();
    Some((
        StackFrame {
            file: caps[1].to_owned(),
            line: caps[2].parse().ok()?,
            column: caps[3].parse().ok()?,
        },
        whole,
    ))
}

/// One decoded mapping segment: generated column plus the original
/// position it maps back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    gen_col: i64,
    src_idx: i64,
    orig_line: i64,
    orig_col: i64,
}

#[derive(Debug, Deserialize)]
struct SourceMapV3 {
    sources: Vec<String>,
    mappings: String,
}

/// A decoded source map, indexed by generated line for column lookup.
#[derive(Debug)]
pub struct MappingIndex {
    sources: Vec<String>,
    /// Per generated line, segments ascending by generated column.
    lines: Vec<Vec<Segment>>,
}

impl MappingIndex {
    /// Decode a source-map v3 document. Returns `None` on any malformed
    /// content; callers treat that as "no map".
    pub fn parse(content: &str) -> Option<Self> {
        let map: SourceMapV3 = serde_json::from_str(content).ok()?;

        let mut lines = Vec::new();
        let mut src_idx: i64 = 0;
        let mut orig_line: i64 = 0;
        let mut orig_col: i64 = 0;

        for group in map.mappings.split(';') {
            let mut segments = Vec::new();
            let mut gen_col: i64 = 0;
            for raw in group.split(',') {
                if raw.is_empty() {
                    continue;
                }
                let fields = decode_segment(raw).ok()?;
                match fields.len() {
                    1 => {
                        gen_col += fields[0];
                    }
                    4 | 5 => {
                        gen_col += fields[0];
                        src_idx += fields[1];
                        orig_line += fields[2];
                        orig_col += fields[3];
                        segments.push(Segment {
                            gen_col,
                            src_idx,
                            orig_line,
                            orig_col,
                        });
                    }
                    _ => return None,
                }
            }
            lines.push(segments);
        }

        Some(Self {
            sources: map.sources,
            lines,
        })
    }

    /// Map a frame position (1-based) to its original position. Finds the
    /// nearest segment with generated column ≤ the frame column on the
    /// frame's generated line.
    pub fn lookup(&self, line: u32, column: u32) -> Option<StackFrame> {
        let gen_line = (line as usize).checked_sub(1)?;
        let gen_col = i64::from(column.checked_sub(1)?);
        let segments = self.lines.get(gen_line)?;

        let best = segments
            .iter()
            .take_while(|s| s.gen_col <= gen_col)
            .last()?;

        let file = self.sources.get(best.src_idx as usize)?.clone();
        Some(StackFrame {
            file,
            line: u32::try_from(best.orig_line + 1).ok()?,
            column: u32::try_from(best.orig_col + 1).ok()?,
        })
    }
}

/// Lookup seam between the rewriter and map storage, so the rewrite logic
/// tests against plain maps.
pub trait MapLookup {
    /// Fetch the decoded map for a normalized file URL.
    fn get(&self, file_url: &str) -> Option<&MappingIndex>;
}

impl MapLookup for HashMap<String, MappingIndex> {
    fn get(&self, file_url: &str) -> Option<&MappingIndex> {
        Self::get(self, file_url)
    }
}

/// Rewrite every resolvable frame in a stack trace, leaving the rest
/// verbatim.
pub fn rewrite_stack(stack: &str, maps: &impl MapLookup) -> String {
    let mut out = Vec::new();
    for line in stack.lines() {
        out.push(rewrite_line(line, maps));
    }
    out.join("\n")
}

fn rewrite_line(line: &str, maps: &impl MapLookup) -> String {
    let Some((frame, span)) = parse_frame(line) else {
        return line.to_owned();
    };
    let normalized = normalize_frame_url(&frame.file);
    let Some(index) = maps.get(&normalized) else {
        return line.to_owned();
    };
    let Some(original) = index.lookup(frame.line, frame.column) else {
        return line.to_owned();
    };

    let mut rewritten = String::with_capacity(line.len());
    rewritten.push_str(&line[..span.start]);
    rewritten.push_str(&format!(
        "{}:{}:{}",
        original.file, original.line, original.column
    ));
    rewritten.push_str(&line[span.end..]);
    rewritten
}
