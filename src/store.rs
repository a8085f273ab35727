//! Prediction store
//!
//! Append-only log of scored predictions over a single SQLite
//! connection. Every insert is also published on a broadcast channel
//! feeding the live stream, so subscribers see new rows without
//! polling.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tokio::sync::broadcast;

/// Broadcast capacity before slow stream subscribers start lagging;
/// lagging subscribers resynchronize from the table by cursor.
const FEED_CAPACITY: usize = 256;

/// One persisted prediction.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct PredictionRow {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub is_fraud: bool,
    pub fraud_prob: f64,
}

/// Wire event for the live feed: `{timestamp, fraud_probability}`.
/// The row id travels alongside for cursor tracking but stays off the
/// wire.
#[derive(Debug, Clone, Serialize)]
pub struct FeedEvent {
    #[serde(skip)]
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub fraud_probability: f64,
}

impl From<&PredictionRow> for FeedEvent {
    fn from(row: &PredictionRow) -> Self {
        Self {
            id: row.id,
            timestamp: row.timestamp,
            fraud_probability: row.fraud_prob,
        }
    }
}

/// Append-only prediction log plus its live-feed channel.
#[derive(Debug, Clone)]
pub struct PredictionStore {
    pool: SqlitePool,
    feed: broadcast::Sender<FeedEvent>,
}

impl PredictionStore {
    pub fn new(pool: SqlitePool) -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self { pool, feed }
    }

    /// Insert one row, assign the next id and publish it to the feed.
    pub async fn record(
        &self,
        timestamp: DateTime<Utc>,
        is_fraud: bool,
        fraud_prob: f64,
    ) -> Result<PredictionRow, sqlx::Error> {
        let row = sqlx::query_as::<_, PredictionRow>(
            r#"
            INSERT INTO predictions (timestamp, is_fraud, fraud_prob)
            VALUES (?1, ?2, ?3)
            RETURNING id, timestamp, is_fraud, fraud_prob
            "#,
        )
        .bind(timestamp)
        .bind(is_fraud)
        .bind(fraud_prob)
        .fetch_one(&self.pool)
        .await?;

        // No receivers is fine; streams subscribe on demand.
        let _ = self.feed.send(FeedEvent::from(&row));

        Ok(row)
    }

    /// All rows with timestamp >= cutoff, in insertion order.
    pub async fn query_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<PredictionRow>, sqlx::Error> {
        sqlx::query_as::<_, PredictionRow>(
            "SELECT id, timestamp, is_fraud, fraud_prob FROM predictions \
             WHERE timestamp >= ?1 ORDER BY id",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
    }

    /// All rows with id > last_id, in id order.
    pub async fn query_after(&self, last_id: i64) -> Result<Vec<PredictionRow>, sqlx::Error> {
        sqlx::query_as::<_, PredictionRow>(
            "SELECT id, timestamp, is_fraud, fraud_prob FROM predictions \
             WHERE id > ?1 ORDER BY id",
        )
        .bind(last_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Zero or one row by id.
    pub async fn query_by_id(&self, id: i64) -> Result<Option<PredictionRow>, sqlx::Error> {
        sqlx::query_as::<_, PredictionRow>(
            "SELECT id, timestamp, is_fraud, fraud_prob FROM predictions WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Total rows in the log.
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM predictions")
            .fetch_one(&self.pool)
            .await
    }

    /// Subscribe to rows inserted from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.feed.subscribe()
    }
}
