//! Ingestion pipeline tests: tailing, rotation, reassembly, pruning, and
//! FTS consistency, driven against real files under a temp root.

mod common;

use std::collections::HashMap;
use std::os::unix::fs::MetadataExt;

use common::{append_lines, spawn_app, write_container};
use mon_log_viewer::db;
use mon_log_viewer::ingest::{self, tail};

const T0: &str = "2024-05-01T10:00:00Z";

#[tokio::test]
async fn tail_ingests_and_persists_cursor() {
    let app = spawn_app().await;
    let log = write_container(&app.root, "abc123", "app");
    append_lines(
        &log,
        &[
            ("[INFO] one", "stdout", T0),
            ("[INFO] two", "stdout", "2024-05-01T10:00:01Z"),
        ],
    );

    let inserted = tail::poll_container(&app.pool, "app", &log, 64 * 1024)
        .await
        .unwrap();
    assert_eq!(inserted, 2);

    let cursor = db::get_cursor(&app.pool, "app").await.unwrap().unwrap();
    let meta = std::fs::metadata(&log).unwrap();
    assert_eq!(cursor.offset as u64, meta.len());
    assert_eq!(cursor.inode as u64, meta.ino());

    // A second poll with no new data inserts nothing.
    let inserted = tail::poll_container(&app.pool, "app", &log, 64 * 1024)
        .await
        .unwrap();
    assert_eq!(inserted, 0);

    // New data resumes from the saved offset without re-reading old lines.
    append_lines(&log, &[("[INFO] three", "stdout", "2024-05-01T10:00:02Z")]);
    let inserted = tail::poll_container(&app.pool, "app", &log, 64 * 1024)
        .await
        .unwrap();
    assert_eq!(inserted, 1);
    assert_eq!(db::count_entries(&app.pool).await.unwrap(), 3);
}

#[tokio::test]
async fn rotation_restarts_from_offset_zero() {
    let app = spawn_app().await;
    let log = write_container(&app.root, "abc123", "app");
    append_lines(&log, &[("[INFO] old", "stdout", T0)]);
    tail::poll_container(&app.pool, "app", &log, 64 * 1024)
        .await
        .unwrap();
    let old_inode = db::get_cursor(&app.pool, "app").await.unwrap().unwrap().inode;

    // Rotate: write a replacement file and rename it over the original so
    // the path keeps its name but changes inode.
    let replacement = log.with_extension("rotated");
    std::fs::write(&replacement, "").unwrap();
    append_lines(
        &replacement,
        &[
            ("[INFO] r1", "stdout", "2024-05-01T11:00:00Z"),
            ("[INFO] r2", "stdout", "2024-05-01T11:00:01Z"),
            ("[INFO] r3", "stdout", "2024-05-01T11:00:02Z"),
        ],
    );
    std::fs::rename(&replacement, &log).unwrap();

    let inserted = tail::poll_container(&app.pool, "app", &log, 64 * 1024)
        .await
        .unwrap();
    assert_eq!(inserted, 3);

    let cursor = db::get_cursor(&app.pool, "app").await.unwrap().unwrap();
    let meta = std::fs::metadata(&log).unwrap();
    assert_ne!(cursor.inode, old_inode);
    assert_eq!(cursor.inode as u64, meta.ino());
    assert_eq!(cursor.offset as u64, meta.len());
}

#[tokio::test]
async fn truncation_restarts_from_offset_zero() {
    let app = spawn_app().await;
    let log = write_container(&app.root, "abc123", "app");
    append_lines(
        &log,
        &[("[INFO] a", "stdout", T0), ("[INFO] b", "stdout", T0)],
    );
    tail::poll_container(&app.pool, "app", &log, 64 * 1024)
        .await
        .unwrap();

    // Truncate in place (same inode, smaller size).
    std::fs::write(&log, "").unwrap();
    append_lines(&log, &[("[INFO] fresh", "stdout", T0)]);

    let inserted = tail::poll_container(&app.pool, "app", &log, 64 * 1024)
        .await
        .unwrap();
    assert_eq!(inserted, 1);
}

#[tokio::test]
async fn first_contact_honors_tail_buffer() {
    let app = spawn_app().await;
    let log = write_container(&app.root, "abc123", "app");
    for i in 0..100 {
        let text = format!("[INFO] line {i}");
        append_lines(&log, &[(text.as_str(), "stdout", T0)]);
    }

    // A tiny tail buffer must skip most of the backlog and start at a line
    // boundary (no torn JSON).
    let inserted = tail::poll_container(&app.pool, "app", &log, 128)
        .await
        .unwrap();
    assert!(inserted >= 1, "should ingest at least the final line");
    assert!(inserted < 100, "must not replay the whole backlog");
}

#[tokio::test]
async fn multiline_traceback_becomes_one_error_entry() {
    let app = spawn_app().await;
    let log = write_container(&app.root, "abc123", "app");
    append_lines(
        &log,
        &[
            ("ERROR: failed", "stderr", T0),
            ("Traceback (most recent call last):", "stderr", T0),
            ("  File \"/x\", line 1", "stderr", T0),
        ],
    );

    let inserted = tail::poll_container(&app.pool, "app", &log, 64 * 1024)
        .await
        .unwrap();
    assert_eq!(inserted, 1);

    let entries = db::query_entries(
        &app.pool,
        &db::LogFilter {
            limit: 10,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert!(entry.message.starts_with("ERROR: failed"));
    assert!(entry.message.contains("Traceback"));
    assert!(entry.message.ends_with("  File \"/x\", line 1"));
    assert_eq!(entry.level, "ERROR");
}

#[tokio::test]
async fn discovery_then_tail_through_poll_cycle() {
    let app = spawn_app().await;

    // First cycle: nothing to discover yet.
    let mut paths = HashMap::new();
    ingest::run_poll_cycle(&app.pool, &app.config, &mut paths).await;
    assert!(paths.is_empty());

    let log = write_container(&app.root, "abc123", "app");
    append_lines(&log, &[("[INFO] hello", "stdout", T0)]);

    ingest::run_poll_cycle(&app.pool, &app.config, &mut paths).await;
    assert!(paths.contains_key("app"));
    assert_eq!(db::count_entries(&app.pool).await.unwrap(), 1);
}

#[tokio::test]
async fn prune_boundary_and_fts_lockstep() {
    let app = spawn_app().await;
    for i in 0..5 {
        common::insert_entry(&app.pool, 100 + i, "app", "INFO", &format!("message {i}")).await;
    }

    // Exactly at capacity: nothing pruned.
    assert_eq!(db::prune_to_max(&app.pool, 5).await.unwrap(), 0);
    assert_eq!(db::count_entries(&app.pool).await.unwrap(), 5);

    // One over: exactly the oldest id goes, and its FTS mirror with it.
    common::insert_entry(&app.pool, 200, "app", "INFO", "message 5").await;
    assert_eq!(db::prune_to_max(&app.pool, 5).await.unwrap(), 1);
    assert_eq!(db::count_entries(&app.pool).await.unwrap(), 5);
    assert_eq!(db::fts_rows_for(&app.pool, 1).await.unwrap(), 0);
    assert_eq!(db::fts_rows_for(&app.pool, 2).await.unwrap(), 1);

    // The pruned message is no longer searchable.
    let hits = db::query_entries(
        &app.pool,
        &db::LogFilter {
            search: Some("\"message 0\"".to_owned()),
            limit: 10,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn fts_search_matches_message_text() {
    let app = spawn_app().await;
    common::insert_entry(&app.pool, 100, "app", "ERROR", "database connection refused").await;
    common::insert_entry(&app.pool, 101, "app", "INFO", "request served").await;

    let hits = db::query_entries(
        &app.pool,
        &db::LogFilter {
            search: Some("refused".to_owned()),
            limit: 10,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].level, "ERROR");
}
