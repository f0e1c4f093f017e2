//! HTTP integration tests for the error deduplication flow.

mod common;

use common::{sample_report, spawn_app, API_KEY};
use reqwest::StatusCode;

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

async fn ingest(app: &common::TestApp, body: &serde_json::Value) -> (StatusCode, serde_json::Value) {
    let resp = client()
        .post(format!("{}/api/errors", app.base))
        .header("X-API-Key", API_KEY)
        .json(body)
        .send()
        .await
        .unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn dedup_then_resolve_then_reopen() {
    let app = spawn_app().await;
    let report = sample_report();

    let (status, body) = ingest(&app, &report).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "created");
    assert_eq!(body["count"], 1);
    let id = body["group_id"].as_i64().unwrap();

    for expected in [2, 3] {
        let (status, body) = ingest(&app, &report).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "incremented");
        assert_eq!(body["count"], expected);
    }

    let resp = client()
        .post(format!("{}/api/errors/{id}/resolve", app.base))
        .header("X-API-Key", API_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let resolved: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(resolved["resolved"], true);
    assert!(resolved["resolved_at"].is_string());

    let (status, body) = ingest(&app, &report).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "reopened");
    assert_eq!(body["group_id"].as_i64(), Some(id));
    assert_eq!(body["count"], 4);

    let resp = client()
        .get(format!("{}/api/errors/{id}", app.base))
        .header("X-API-Key", API_KEY)
        .send()
        .await
        .unwrap();
    let detail: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(detail["resolved"], false);
    assert!(detail["resolved_at"].is_null());
}

#[tokio::test]
async fn occurrence_ring_keeps_last_five() {
    let app = spawn_app().await;
    let report = sample_report();

    let mut id = 0;
    for _ in 0..7 {
        let (_, body) = ingest(&app, &report).await;
        id = body["group_id"].as_i64().unwrap();
    }

    let resp = client()
        .get(format!("{}/api/errors/{id}", app.base))
        .header("X-API-Key", API_KEY)
        .send()
        .await
        .unwrap();
    let detail: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(detail["count"], 7);
    assert_eq!(detail["occurrences"].as_array().unwrap().len(), 5);

    let stored = mon_error_tracker::db::count_occurrences(&app.pool, id)
        .await
        .unwrap();
    assert_eq!(stored, 5);
}

#[tokio::test]
async fn resolve_is_idempotent() {
    let app = spawn_app().await;
    let (_, body) = ingest(&app, &sample_report()).await;
    let id = body["group_id"].as_i64().unwrap();

    let first: serde_json::Value = client()
        .post(format!("{}/api/errors/{id}/resolve", app.base))
        .header("X-API-Key", API_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let second: serde_json::Value = client()
        .post(format!("{}/api/errors/{id}/resolve", app.base))
        .header("X-API-Key", API_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(first["resolved_at"], second["resolved_at"]);
}

#[tokio::test]
async fn resolve_unknown_group_is_404() {
    let app = spawn_app().await;
    let resp = client()
        .post(format!("{}/api/errors/999/resolve", app.base))
        .header("X-API-Key", API_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn listing_filters_by_source_and_resolution() {
    let app = spawn_app().await;

    let mut browser = sample_report();
    browser["project"] = "web".into();
    browser["request_method"] = "BROWSER".into();
    ingest(&app, &browser).await;

    let mut server = sample_report();
    server["project"] = "api".into();
    server["traceback"] = "  File \"/b.py\", line 1, in g\n    raise".into();
    let (_, body) = ingest(&app, &server).await;
    let server_id = body["group_id"].as_i64().unwrap();

    let list: serde_json::Value = client()
        .get(format!("{}/api/errors?source=browser", app.base))
        .header("X-API-Key", API_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["total"], 1);
    assert_eq!(list["errors"][0]["project"], "web");

    let list: serde_json::Value = client()
        .get(format!("{}/api/errors?source=server", app.base))
        .header("X-API-Key", API_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["total"], 1);
    assert_eq!(list["errors"][0]["project"], "api");

    // Resolved groups drop out of the default listing.
    client()
        .post(format!("{}/api/errors/{server_id}/resolve", app.base))
        .header("X-API-Key", API_KEY)
        .send()
        .await
        .unwrap();
    let list: serde_json::Value = client()
        .get(format!("{}/api/errors", app.base))
        .header("X-API-Key", API_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["total"], 1);
    let list: serde_json::Value = client()
        .get(format!("{}/api/errors?resolved=true", app.base))
        .header("X-API-Key", API_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["total"], 1);
    assert_eq!(list["errors"][0]["project"], "api");
}

#[tokio::test]
async fn session_filter_matches_extra() {
    let app = spawn_app().await;

    let mut tagged = sample_report();
    tagged["extra"] = serde_json::json!({"session_id": "s-123"});
    ingest(&app, &tagged).await;

    let mut other = sample_report();
    other["traceback"] = "  File \"/other.py\", line 2, in h\n    raise".into();
    ingest(&app, &other).await;

    let list: serde_json::Value = client()
        .get(format!("{}/api/errors?session_id=s-123", app.base))
        .header("X-API-Key", API_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["total"], 1);
}

#[tokio::test]
async fn projects_are_distinct_and_sorted() {
    let app = spawn_app().await;
    for project in ["zeta", "alpha", "alpha"] {
        let mut report = sample_report();
        report["project"] = project.into();
        ingest(&app, &report).await;
    }

    let projects: Vec<String> = client()
        .get(format!("{}/api/projects", app.base))
        .header("X-API-Key", API_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(projects, vec!["alpha", "zeta"]);
}

#[tokio::test]
async fn alert_fires_only_on_created() {
    let app = spawn_app().await;
    let report = sample_report();

    ingest(&app, &report).await; // created
    ingest(&app, &report).await; // incremented

    // The alert is dispatched from a spawned task; poll briefly.
    for _ in 0..50 {
        if !app.sent.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let sent = app.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].0.contains("ValueError"));
    assert_eq!(sent[0].2, vec!["ops@example.com".to_owned()]);
}

#[tokio::test]
async fn missing_api_key_is_401_and_health_is_open() {
    let app = spawn_app().await;

    let resp = client()
        .get(format!("{}/api/errors", app.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client()
        .get(format!("{}/health", app.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn validation_failures_are_400_without_state_change() {
    let app = spawn_app().await;

    let resp = client()
        .post(format!("{}/api/errors", app.base))
        .header("X-API-Key", API_KEY)
        .json(&serde_json::json!({"project": "p"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let mut oversize = sample_report();
    oversize["project"] = "p".repeat(101).into();
    let resp = client()
        .post(format!("{}/api/errors", app.base))
        .header("X-API-Key", API_KEY)
        .json(&oversize)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let groups = mon_error_tracker::db::count_groups(&app.pool).await.unwrap();
    assert_eq!(groups, 0);
}

#[tokio::test]
async fn oversize_body_is_rejected_with_413() {
    let app = spawn_app().await;

    let mut big = sample_report();
    big["traceback"] = "x".repeat(256 * 1024).into();
    let resp = client()
        .post(format!("{}/api/errors", app.base))
        .header("X-API-Key", API_KEY)
        .json(&big)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn retention_sweep_removes_only_old_resolved_groups() {
    let app = spawn_app().await;

    let (_, body) = ingest(&app, &sample_report()).await;
    let resolved_id = body["group_id"].as_i64().unwrap();
    client()
        .post(format!("{}/api/errors/{resolved_id}/resolve", app.base))
        .header("X-API-Key", API_KEY)
        .send()
        .await
        .unwrap();

    let mut fresh = sample_report();
    fresh["traceback"] = "  File \"/fresh.py\", line 9, in f\n    raise".into();
    ingest(&app, &fresh).await;

    // Sweep as if 91 days have passed.
    let future = mon_common::time::now() + 91 * 86_400;
    mon_error_tracker::retention::run_retention_cycle(&app.pool, 90, future).await;

    let groups = mon_error_tracker::db::count_groups(&app.pool).await.unwrap();
    assert_eq!(groups, 1);
    assert!(mon_error_tracker::db::get_group(&app.pool, resolved_id)
        .await
        .unwrap()
        .is_none());
}
