mod mysql;
mod postgres;

#[cfg(test)]
pub mod memory;

pub use mysql::{connect_destination, MySqlAggregateSink};
pub use postgres::{connect_source_with_retry, PgReadingSource};

use crate::aggregate::AggregateRecord;
use crate::error::AggregateResult;
use crate::reading::RawReading;
use crate::window::TimeWindow;
use std::future::Future;

/// Read side of the pipeline: the upstream `devices` table.
pub trait ReadingSource {
    /// Every row currently visible, in the store's scan order.
    fn scan_readings(&self) -> impl Future<Output = AggregateResult<Vec<RawReading>>> + Send;

    /// Rows of one device inside `window`, ascending by timestamp.
    fn window_readings(
        &self,
        device_id: &str,
        window: TimeWindow,
    ) -> impl Future<Output = AggregateResult<Vec<RawReading>>> + Send;
}

/// Write side: one live aggregate per device, replaced on every upsert.
pub trait AggregateSink {
    fn upsert(&self, record: &AggregateRecord) -> impl Future<Output = AggregateResult<()>> + Send;
}
