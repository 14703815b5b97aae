mod runner;
mod summary;


pub use summary::summarize_window;

use chrono::{DateTime, Utc};

/// Latest hourly statistics for one device; the destination keeps exactly one
/// per `device_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRecord {
    pub device_id: String,
    /// Start of the aggregated hour, not the timestamp of any one reading.
    /// Every pass over the same window writes the same value.
    pub window_time: DateTime<Utc>,
    pub max_temperature: f64,
    pub data_points: i64,
    pub total_distance_km: f64,
}

/// Everything one aggregation pass needs: where readings come from and where
/// aggregates go. Built once at startup and reused for every pass.
pub struct Aggregator<S, D> {
    source: S,
    sink: D,
}

impl<S, D> Aggregator<S, D> {
    pub fn new(source: S, sink: D) -> Self {
        Self { source, sink }
    }
}
