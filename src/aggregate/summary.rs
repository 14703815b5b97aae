use super::AggregateRecord;
use crate::error::AggregateResult;
use crate::geo::distance_km;
use crate::reading::RawReading;
use crate::window::TimeWindow;

/// Folds one device's readings for `window` into an aggregate.
///
/// Readings outside `window` are ignored. Returns `Ok(None)` when none are
/// left; the caller writes nothing in that case. Distance is summed leg by leg between consecutive readings in
/// timestamp order, so the input order does not matter.
pub fn summarize_window(
    device_id: &str,
    window: TimeWindow,
    readings: &[RawReading],
) -> AggregateResult<Option<AggregateRecord>> {
    let mut ordered: Vec<&RawReading> = readings
        .iter()
        .filter(|reading| window.contains(reading.timestamp))
        .collect();
    if ordered.is_empty() {
        return Ok(None);
    }
    ordered.sort_by_key(|reading| reading.timestamp);

    let max_temperature = ordered
        .iter()
        .map(|reading| reading.temperature)
        .fold(f64::NEG_INFINITY, f64::max);

    let total_distance_km: f64 = ordered
        .windows(2)
        .map(|pair| distance_km(pair[0].location, pair[1].location))
        .sum();

    Ok(Some(AggregateRecord {
        device_id: device_id.to_string(),
        window_time: window.start_time()?,
        max_temperature,
        data_points: ordered.len() as i64,
        total_distance_km,
    }))
}
