//! Cursor-Tracked File Tailing
//!
//! Each poll stats the log file, decides where to resume from the saved
//! `(inode, offset)` cursor, reads to EOF, feeds lines through the
//! reassembler, and persists the new cursor. An inode change means the file
//! rotated; a shrunken file under the same inode means it was truncated.
//! Both restart from offset 0.

use std::io::SeekFrom;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::info;

use super::docker::decode_line;
use super::level::extract_level;
use super::reassemble::{AssembledEntry, Reassembler};
use crate::db::{self, NewLogEntry};

/// Where to begin reading, given the saved cursor and the on-disk file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeDecision {
    /// First contact: start near the end, aligned to the next line boundary.
    TailFrom(u64),
    /// Cursor is valid: resume exactly where we left off.
    ResumeAt(u64),
    /// Same inode, smaller file: truncated, restart from the top.
    Truncated,
    /// Different inode: rotated, restart from the top.
    Rotated,
}

/// Pure resume decision. `saved` is `(inode, offset)` from the cursor row.
pub fn resume_decision(
    saved: Option<(i64, i64)>,
    inode: u64,
    size: u64,
    tail_buffer: u64,
) -> ResumeDecision {
    match saved {
        None => ResumeDecision::TailFrom(size.saturating_sub(tail_buffer)),
        Some((saved_inode, saved_offset)) => {
            if saved_inode as u64 != inode {
                ResumeDecision::Rotated
            } else if saved_offset as u64 > size {
                ResumeDecision::Truncated
            } else {
                ResumeDecision::ResumeAt(saved_offset as u64)
            }
        }
    }
}

/// Poll one container's log file once. Returns the number of entries
/// persisted.
pub async fn poll_container(
    pool: &SqlitePool,
    container: &str,
    path: &Path,
    tail_buffer: u64,
) -> Result<usize> {
    let meta = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("stat failed for {}", path.display()))?;
    let inode = meta.ino();
    let size = meta.len();

    let cursor = db::get_cursor(pool, container).await?;
    let decision = resume_decision(cursor.map(|c| (c.inode, c.offset)), inode, size, tail_buffer);

    let mut align_to_line = false;
    let offset = match decision {
        ResumeDecision::TailFrom(offset) => {
            align_to_line = offset > 0;
            offset
        }
        ResumeDecision::ResumeAt(offset) => offset,
        ResumeDecision::Truncated => {
            info!(container = %container, "Log file truncated, restarting from start");
            0
        }
        ResumeDecision::Rotated => {
            info!(container = %container, "Log file rotated, restarting from start");
            0
        }
    };

    let mut inserted = 0;
    if offset < size {
        let mut file = File::open(path)
            .await
            .with_context(|| format!("open failed for {}", path.display()))?;
        file.seek(SeekFrom::Start(offset)).await?;
        let mut buf = Vec::with_capacity((size - offset) as usize);
        file.read_to_end(&mut buf).await?;

        let text = String::from_utf8_lossy(&buf);
        let mut body: &str = &text;
        if align_to_line {
            // The tail-buffer seek usually lands mid-line; skip the partial.
            body = match body.find('\n') {
                Some(i) => &body[i + 1..],
                None => "",
            };
        }

        let fallback_ts = mon_common::time::now();
        let mut reassembler = Reassembler::new();
        let mut entries = Vec::new();
        for raw_line in body.lines() {
            if raw_line.is_empty() {
                continue;
            }
            let Some(decoded) = decode_line(raw_line, fallback_ts) else {
                continue;
            };
            if let Some(done) = reassembler.push(decoded) {
                entries.push(to_new_entry(container, done));
            }
        }
        if let Some(done) = reassembler.flush() {
            entries.push(to_new_entry(container, done));
        }

        db::insert_entries(pool, &entries).await?;
        inserted = entries.len();
    }

    db::upsert_cursor(
        pool,
        container,
        &path.to_string_lossy(),
        size as i64,
        inode as i64,
        mon_common::time::now(),
    )
    .await?;

    Ok(inserted)
}

fn to_new_entry(container: &str, entry: AssembledEntry) -> NewLogEntry {
    let level = extract_level(&entry.message, &entry.stream);
    NewLogEntry {
        ts: entry.ts,
        container: container.to_owned(),
        stream: entry.stream,
        level: level.to_owned(),
        message: entry.message,
    }
}
