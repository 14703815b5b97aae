use crate::error::{AggregateError, AggregateResult};
use chrono::{TimeZone, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// One row of the upstream `devices` table, with `location` already decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReading {
    pub device_id: String,
    pub temperature: f64,
    pub location: Location,
    /// Seconds since the Unix epoch, UTC.
    pub timestamp: i64,
}

/// Decodes the JSON-encoded `location` column. Extra keys are ignored; missing
/// or non-numeric `latitude` / `longitude` are errors.
pub fn parse_location(device_id: &str, raw: &str) -> AggregateResult<Location> {
    let mut bytes = raw.as_bytes().to_vec();
    simd_json::serde::from_slice::<Location>(&mut bytes).map_err(|source| {
        AggregateError::MalformedLocation {
            device_id: device_id.to_string(),
            source,
        }
    })
}

/// The source stores `time` either as an integer column or as its decimal text.
/// Values chrono cannot represent as a UTC instant are rejected, which keeps
/// every accepted timestamp's hour window within `i64`.
pub fn parse_timestamp(device_id: &str, raw: &str) -> AggregateResult<i64> {
    let timestamp = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| AggregateError::InvalidTimestamp {
            device_id: device_id.to_string(),
            raw: raw.to_string(),
        })?;
    match Utc.timestamp_opt(timestamp, 0).single() {
        Some(_) => Ok(timestamp),
        None => Err(AggregateError::TimestampOutOfRange(timestamp)),
    }
}

impl RawReading {
    pub fn from_columns(
        device_id: String,
        temperature: f64,
        location: &str,
        time: &str,
    ) -> AggregateResult<Self> {
        let location = parse_location(&device_id, location)?;
        let timestamp = parse_timestamp(&device_id, time)?;
        Ok(Self {
            device_id,
            temperature,
            location,
            timestamp,
        })
    }
}
