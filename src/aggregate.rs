//! Aggregate metrics over stored predictions

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::Serialize;

use crate::store::PredictionRow;

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentMetrics {
    #[serde(rename = "fraudRate")]
    pub fraud_rate: f64,
    #[serde(rename = "txnPerHour")]
    pub txn_per_hour: f64,
}

/// Mean fraud probability for one hour bucket.
#[derive(Debug, Clone, Serialize)]
pub struct HourlyPoint {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "avgFraudProbability")]
    pub avg_fraud_probability: f64,
}

/// `/metrics` response body.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub current: CurrentMetrics,
    pub history: Vec<HourlyPoint>,
}

/// Summarize a window of rows: overall fraud rate, mean bucket size
/// across non-empty hour buckets, and the per-hour mean probability
/// series in ascending hour order.
pub fn summarize(rows: &[PredictionRow]) -> MetricsReport {
    if rows.is_empty() {
        return MetricsReport {
            current: CurrentMetrics {
                fraud_rate: 0.0,
                txn_per_hour: 0.0,
            },
            history: Vec::new(),
        };
    }

    let total = rows.len() as f64;
    let frauds = rows.iter().filter(|r| r.is_fraud).count() as f64;

    let mut buckets: BTreeMap<DateTime<Utc>, (f64, u64)> = BTreeMap::new();
    for row in rows {
        let (sum, count) = buckets.entry(hour_bucket(row.timestamp)).or_default();
        *sum += row.fraud_prob;
        *count += 1;
    }

    let history = buckets
        .iter()
        .map(|(hour, (sum, count))| HourlyPoint {
            timestamp: *hour,
            avg_fraud_probability: sum / *count as f64,
        })
        .collect();

    MetricsReport {
        current: CurrentMetrics {
            fraud_rate: frauds / total,
            txn_per_hour: total / buckets.len() as f64,
        },
        history,
    }
}

/// Truncate a timestamp to the start of its hour.
fn hour_bucket(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.duration_trunc(Duration::hours(1)).unwrap_or(ts)
}
