//! Multiline Reassembly
//!
//! Consecutive log lines that belong to one semantic entry (a Python
//! traceback, a wrapped stack dump) are joined before persistence. The
//! classifier is a single explicit predicate: start patterns are probed
//! first, then continuation patterns; anything matching neither begins its
//! own entry.

use std::sync::LazyLock;

use regex::Regex;

use super::docker::DecodedLine;

/// `2024-05-01 ...` — a date-led line opens a new entry.
static DATE_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("static regex"));

/// `[INFO] ...`
static BRACKET_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\[(DEBUG|INFO|WARNING|WARN|ERROR|ERR|CRITICAL|CRIT|FATAL)\]")
        .expect("static regex")
});

/// `ERROR: ...` (including uvicorn's padded `INFO:    ` form)
static PREFIX_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(DEBUG|INFO|WARNING|WARN|ERROR|ERR|CRITICAL|CRIT|FATAL)\s*:")
        .expect("static regex")
});

/// How a raw line relates to the entry being assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Start,
    Continuation,
}

/// Classify one decoded line.
pub fn classify_line(text: &str) -> LineClass {
    if DATE_START.is_match(text)
        || BRACKET_START.is_match(text)
        || PREFIX_START.is_match(text)
        || text.starts_with('{')
    {
        return LineClass::Start;
    }

    if text.is_empty()
        || text.starts_with(char::is_whitespace)
        || text.starts_with("Traceback (most recent call last):")
        || text.starts_with("File \"")
    {
        return LineClass::Continuation;
    }

    LineClass::Start
}

/// A fully reassembled entry, carrying the stream and timestamp of its
/// first line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledEntry {
    pub ts: i64,
    pub stream: String,
    pub message: String,
}

/// Buffers at most one in-flight entry. Feed decoded lines with [`push`];
/// call [`flush`] when the poll batch ends.
///
/// [`push`]: Reassembler::push
/// [`flush`]: Reassembler::flush
#[derive(Debug, Default)]
pub struct Reassembler {
    pending: Option<AssembledEntry>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line. Returns the previously buffered entry when this line
    /// starts a new one.
    pub fn push(&mut self, line: DecodedLine) -> Option<AssembledEntry> {
        match classify_line(&line.text) {
            LineClass::Start => {
                let completed = self.pending.take();
                self.pending = Some(AssembledEntry {
                    ts: line.ts,
                    stream: line.stream,
                    message: line.text,
                });
                completed
            }
            LineClass::Continuation => {
                match &mut self.pending {
                    Some(entry) => {
                        entry.message.push('\n');
                        entry.message.push_str(&line.text);
                    }
                    // A batch can begin mid-entry; adopt the fragment.
                    None => {
                        self.pending = Some(AssembledEntry {
                            ts: line.ts,
                            stream: line.stream,
                            message: line.text,
                        });
                    }
                }
                None
            }
        }
    }

    /// Flush the in-flight entry at the end of a poll batch.
    pub fn flush(&mut self) -> Option<AssembledEntry> {
        self.pending.take()
    }
}
