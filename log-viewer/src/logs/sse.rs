//! SSE Live Tail
//!
//! A capacity-limited streaming endpoint. Each connection polls the store
//! once per second for entries beyond the cursor established at connect
//! time, emits a `heartbeat` after 15 idle seconds, and closes itself after
//! 30 minutes. The writer task notices a gone client as a failed channel
//! send (the next heartbeat or event) and releases its capacity slot.

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use mon_common::ApiError;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use super::types::{LogEntryView, TailParams};
use crate::api::AppState;
use crate::db;

/// Process-wide live-tail connection cap.
pub const MAX_TAIL_CONNECTIONS: usize = 5;

/// Seconds of silence before a `heartbeat` event.
const HEARTBEAT_IDLE_SECS: u64 = 15;

/// Hard connection lifetime.
const MAX_LIFETIME: Duration = Duration::from_secs(30 * 60);

/// Rows fetched per poll; anything beyond carries over to the next second.
const POLL_BATCH: i64 = 256;

/// Claim a capacity slot, failing when the cap is reached.
fn try_acquire(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
            (current < MAX_TAIL_CONNECTIONS).then_some(current + 1)
        })
        .is_ok()
}

/// `GET /api/logs/tail` — SSE stream of new entries.
pub async fn tail_logs(
    State(state): State<AppState>,
    Query(params): Query<TailParams>,
) -> Result<Sse<ReceiverStream<Result<Event, Infallible>>>, ApiError> {
    if !try_acquire(&state.tail_connections) {
        return Err(ApiError::ServerBusy);
    }

    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(64);
    let pool = state.db.clone();
    let counter = state.tail_connections.clone();
    let level = params.level.map(|l| l.to_ascii_uppercase());
    let container = params.container;

    tokio::spawn(async move {
        let started = Instant::now();
        let mut cursor = db::max_entry_id(&pool).await.unwrap_or(0);
        let mut idle_secs: u64 = 0;

        'conn: loop {
            if started.elapsed() >= MAX_LIFETIME {
                let _ = tx
                    .send(Ok(Event::default().event("close").data("timeout")))
                    .await;
                break;
            }

            tokio::time::sleep(Duration::from_secs(1)).await;

            let rows = db::entries_after(
                &pool,
                cursor,
                container.as_deref(),
                level.as_deref(),
                POLL_BATCH,
            )
            .await
            .unwrap_or_default();

            if rows.is_empty() {
                idle_secs += 1;
                if idle_secs >= HEARTBEAT_IDLE_SECS {
                    idle_secs = 0;
                    if tx
                        .send(Ok(Event::default().event("heartbeat").data("ping")))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                continue;
            }

            idle_secs = 0;
            for row in rows {
                cursor = cursor.max(row.id);
                let data =
                    serde_json::to_string(&LogEntryView::from(row)).unwrap_or_default();
                if tx
                    .send(Ok(Event::default().event("log").data(data)))
                    .await
                    .is_err()
                {
                    break 'conn;
                }
            }
        }

        counter.fetch_sub(1, Ordering::SeqCst);
        debug!("Live tail connection closed");
    });

    Ok(Sse::new(ReceiverStream::new(rx)))
}
