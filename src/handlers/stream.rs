//! Live prediction feed (SSE)
//!
//! Push-based: each connection subscribes to the store's broadcast
//! channel, replays the backlog once, then forwards new rows as they
//! are inserted. A per-connection cursor guarantees each row is
//! delivered at most once and in id order; a lagged subscriber
//! resynchronizes from the table by cursor.

use std::collections::VecDeque;
use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream};
use tokio::sync::broadcast;

use crate::store::{FeedEvent, PredictionStore};
use crate::{AppResult, AppState};

struct FeedCursor {
    store: PredictionStore,
    rx: broadcast::Receiver<FeedEvent>,
    pending: VecDeque<FeedEvent>,
    last_id: i64,
}

impl FeedCursor {
    /// Next event with id > cursor, advancing the cursor. `None` when
    /// the store is gone.
    async fn next_event(&mut self) -> Option<FeedEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                if event.id <= self.last_id {
                    continue;
                }
                self.last_id = event.id;
                return Some(event);
            }

            match self.rx.recv().await {
                Ok(event) => {
                    if event.id <= self.last_id {
                        continue;
                    }
                    // Concurrent inserts may publish out of id order;
                    // on a gap, refill from the table instead of
                    // skipping the missing row. The cursor must not
                    // advance past ids it has not delivered, so a
                    // failed refill ends the stream like a failed
                    // resync does.
                    if event.id > self.last_id + 1 {
                        match self.store.query_after(self.last_id).await {
                            Ok(rows) => {
                                self.pending = rows.iter().map(FeedEvent::from).collect();
                                continue;
                            }
                            Err(e) => {
                                tracing::error!("stream gap refill failed: {}", e);
                                return None;
                            }
                        }
                    }
                    self.last_id = event.id;
                    return Some(event);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "stream subscriber lagged, resyncing from store");
                    match self.store.query_after(self.last_id).await {
                        Ok(rows) => {
                            self.pending = rows.iter().map(FeedEvent::from).collect();
                        }
                        Err(e) => {
                            tracing::error!("stream resync failed: {}", e);
                            return None;
                        }
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Open a live feed of `{timestamp, fraud_probability}` events. Rows
/// already stored are replayed first; the connection then stays open
/// until the client disconnects.
pub async fn stream(
    State(state): State<AppState>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    // Subscribe before reading the backlog so no insert can fall
    // between the two; the cursor drops any duplicate.
    let rx = state.store.subscribe();
    let backlog = state.store.query_after(0).await?;

    let cursor = FeedCursor {
        store: state.store.clone(),
        rx,
        pending: backlog.iter().map(FeedEvent::from).collect(),
        last_id: 0,
    };

    let events = stream::unfold(cursor, |mut cursor| async move {
        let event = cursor.next_event().await?;
        let sse = Event::default()
            .json_data(&event)
            .unwrap_or_else(|_| Event::default().data("{}"));
        Some((Ok(sse), cursor))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
