use super::{summarize_window, AggregateRecord, Aggregator};
use crate::error::AggregateResult;
use crate::reading::RawReading;
use crate::store::{AggregateSink, ReadingSource};
use crate::window::TimeWindow;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, Default)]
pub struct PassReport {
    pub readings: usize,
    pub devices: usize,
    pub records_written: usize,
    pub empty_windows: usize,
    pub elapsed: Duration,
}

impl<S, D> Aggregator<S, D>
where
    S: ReadingSource,
    D: AggregateSink,
{
    /// Aggregates `device_id` over `window`, or `None` if the window is empty.
    pub async fn aggregate_device(
        &self,
        device_id: &str,
        window: TimeWindow,
    ) -> AggregateResult<Option<AggregateRecord>> {
        let readings = self.source.window_readings(device_id, window).await?;
        summarize_window(device_id, window, &readings)
    }

    /// One full scan, resolve, aggregate, write cycle. Any error aborts the
    /// pass; records already written stay written.
    pub async fn run_pass(&self) -> AggregateResult<PassReport> {
        let started = Instant::now();
        let readings = self.source.scan_readings().await?;
        let windows = resolve_current_windows(&readings);

        let mut report = PassReport {
            readings: readings.len(),
            devices: windows.len(),
            ..PassReport::default()
        };

        for (device_id, window) in &windows {
            let Some(record) = self.aggregate_device(device_id, *window).await? else {
                tracing::debug!(
                    device = %device_id,
                    window_start = window.start,
                    "no readings in window"
                );
                report.empty_windows += 1;
                continue;
            };

            self.sink.upsert(&record).await?;
            report.records_written += 1;
            tracing::info!(
                device = %record.device_id,
                window_start = %record.window_time,
                max_temperature = record.max_temperature,
                data_points = record.data_points,
                total_distance_km = record.total_distance_km,
                "aggregated device window"
            );
        }

        report.elapsed = started.elapsed();
        Ok(report)
    }

    /// Runs passes back to back, `poll_interval` apart, until `cancel` fires.
    /// Cancellation is checked between passes only. Returns the number of
    /// completed passes; the first failing pass ends the loop with its error.
    pub async fn run(
        &self,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> AggregateResult<u64> {
        let mut passes: u64 = 0;
        while !cancel.is_cancelled() {
            let report = match self.run_pass().await {
                Ok(report) => report,
                Err(err) => {
                    tracing::error!(error = %err, passes, "aggregation pass failed");
                    return Err(err);
                }
            };
            passes += 1;
            tracing::debug!(
                pass = passes,
                readings = report.readings,
                devices = report.devices,
                written = report.records_written,
                empty = report.empty_windows,
                micros = report.elapsed.as_micros() as u64,
                "aggregation pass complete"
            );

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(poll_interval) => {}
            }
        }
        tracing::info!(passes, "aggregation loop stopped");
        Ok(passes)
    }
}

/// Picks, per device, the window of the last row seen in scan order.
pub(in crate::aggregate) fn resolve_current_windows(
    readings: &[RawReading],
) -> BTreeMap<String, TimeWindow> {
    let mut windows = BTreeMap::new();
    for reading in readings {
        windows.insert(
            reading.device_id.clone(),
            TimeWindow::containing(reading.timestamp),
        );
    }
    windows
}
