use super::ReadingSource;
use crate::error::AggregateResult;
use crate::reading::RawReading;
use crate::window::TimeWindow;
use anyhow::{Context, Result};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;

const POSTGRES_CANNOT_CONNECT_NOW: &str = "57P03";

#[derive(Clone)]
pub struct PgReadingSource {
    pool: PgPool,
}

impl PgReadingSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ReadingSource for PgReadingSource {
    async fn scan_readings(&self) -> AggregateResult<Vec<RawReading>> {
        let rows = sqlx::query(
            r#"
            SELECT
                device_id,
                temperature::double precision AS temperature,
                location::text AS location,
                "time"::text AS time
            FROM devices
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(reading_from_row).collect()
    }

    async fn window_readings(
        &self,
        device_id: &str,
        window: TimeWindow,
    ) -> AggregateResult<Vec<RawReading>> {
        let rows = sqlx::query(
            r#"
            SELECT
                device_id,
                temperature::double precision AS temperature,
                location::text AS location,
                "time"::text AS time
            FROM devices
            WHERE device_id = $1
              AND CAST("time" AS BIGINT) >= $2
              AND CAST("time" AS BIGINT) < $3
            ORDER BY CAST("time" AS BIGINT) ASC
            "#,
        )
        .bind(device_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(reading_from_row).collect()
    }
}

fn reading_from_row(row: &PgRow) -> AggregateResult<RawReading> {
    let device_id = row.try_get::<String, _>("device_id")?;
    let temperature = row.try_get::<f64, _>("temperature")?;
    let location = row.try_get::<String, _>("location")?;
    let time = row.try_get::<String, _>("time")?;
    RawReading::from_columns(device_id, temperature, &location, &time)
}

/// Connects to the source database, retrying for as long as the server is not
/// accepting connections yet. Configuration and authentication errors are
/// returned immediately.
pub async fn connect_source_with_retry(
    database_url: &str,
    max_connections: u32,
    retry_interval: Duration,
) -> Result<PgPool> {
    let mut attempts: u64 = 0;
    loop {
        attempts += 1;
        let result = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await;
        match result {
            Ok(pool) => {
                tracing::info!(attempts, "connected to source database");
                return Ok(pool);
            }
            Err(err) if is_not_ready(&err) => {
                if attempts == 1 || attempts % 50 == 0 {
                    tracing::warn!(attempts, error = %err, "source database not ready; retrying");
                } else {
                    tracing::debug!(attempts, error = %err, "source database not ready; retrying");
                }
                tokio::time::sleep(retry_interval).await;
            }
            Err(err) => return Err(err).context("failed to connect to source database"),
        }
    }
}

fn is_not_ready(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => db.code().as_deref() == Some(POSTGRES_CANNOT_CONNECT_NOW),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn transient_connect_errors_are_retried() {
        let refused = sqlx::Error::Io(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(is_not_ready(&refused));
        assert!(is_not_ready(&sqlx::Error::PoolTimedOut));
    }

    #[test]
    fn configuration_errors_are_fatal() {
        let bad_url = sqlx::Error::Configuration("invalid port number".into());
        assert!(!is_not_ready(&bad_url));
        assert!(!is_not_ready(&sqlx::Error::RowNotFound));
    }
}
