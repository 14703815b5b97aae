use super::{AggregateSink, ReadingSource};
use crate::aggregate::AggregateRecord;
use crate::error::AggregateResult;
use crate::reading::RawReading;
use crate::window::TimeWindow;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// A `devices` row as the source would hand it over: location and time still
/// in their stored text form.
#[derive(Debug, Clone)]
pub struct MemoryRow {
    pub device_id: String,
    pub temperature: f64,
    pub location: String,
    pub time: String,
}

impl MemoryRow {
    pub fn new(
        device_id: &str,
        temperature: f64,
        latitude: f64,
        longitude: f64,
        time: i64,
    ) -> Self {
        Self {
            device_id: device_id.to_string(),
            temperature,
            location: serde_json::json!({ "latitude": latitude, "longitude": longitude })
                .to_string(),
            time: time.to_string(),
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<Vec<MemoryRow>>>,
    records: Arc<Mutex<BTreeMap<String, AggregateRecord>>>,
    upserts: Arc<Mutex<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, row: MemoryRow) {
        self.rows.lock().expect("rows lock").push(row);
    }

    pub fn record(&self, device_id: &str) -> Option<AggregateRecord> {
        self.records.lock().expect("records lock").get(device_id).cloned()
    }

    pub fn records(&self) -> Vec<AggregateRecord> {
        self.records.lock().expect("records lock").values().cloned().collect()
    }

    pub fn upsert_count(&self) -> usize {
        *self.upserts.lock().expect("upserts lock")
    }

    fn parsed_rows(&self, device_id: Option<&str>) -> AggregateResult<Vec<RawReading>> {
        let rows = self.rows.lock().expect("rows lock").clone();
        rows.into_iter()
            .filter(|row| device_id.map_or(true, |id| row.device_id == id))
            .map(|row| {
                RawReading::from_columns(row.device_id, row.temperature, &row.location, &row.time)
            })
            .collect()
    }
}

impl ReadingSource for MemoryStore {
    async fn scan_readings(&self) -> AggregateResult<Vec<RawReading>> {
        self.parsed_rows(None)
    }

    async fn window_readings(
        &self,
        device_id: &str,
        window: TimeWindow,
    ) -> AggregateResult<Vec<RawReading>> {
        let mut readings: Vec<RawReading> = self
            .parsed_rows(Some(device_id))?
            .into_iter()
            .filter(|reading| window.contains(reading.timestamp))
            .collect();
        readings.sort_by_key(|reading| reading.timestamp);
        Ok(readings)
    }
}

impl AggregateSink for MemoryStore {
    async fn upsert(&self, record: &AggregateRecord) -> AggregateResult<()> {
        self.records
            .lock()
            .expect("records lock")
            .insert(record.device_id.clone(), record.clone());
        *self.upserts.lock().expect("upserts lock") += 1;
        Ok(())
    }
}
