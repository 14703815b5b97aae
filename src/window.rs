use crate::error::{AggregateError, AggregateResult};
use chrono::{DateTime, TimeZone, Utc};

pub const WINDOW_SECONDS: i64 = 3600;

/// Half-open hour bucket `[start, end)` in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    pub fn containing(timestamp: i64) -> Self {
        let start = align_down(timestamp, WINDOW_SECONDS);
        Self {
            start,
            end: start + WINDOW_SECONDS,
        }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.start <= timestamp && timestamp < self.end
    }

    pub fn start_time(&self) -> AggregateResult<DateTime<Utc>> {
        Utc.timestamp_opt(self.start, 0)
            .single()
            .ok_or(AggregateError::TimestampOutOfRange(self.start))
    }
}

fn align_down(ts: i64, interval_seconds: i64) -> i64 {
    let interval = interval_seconds.max(1);
    ts.div_euclid(interval) * interval
}
