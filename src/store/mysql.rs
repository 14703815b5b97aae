use super::AggregateSink;
use crate::aggregate::AggregateRecord;
use crate::error::AggregateResult;
use anyhow::{Context, Result};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;

pub const AGGREGATE_TABLE: &str = "devices_data_agg";

/// Destination pool. One connection: the aggregation loop is the only writer.
pub async fn connect_destination(database_url: &str) -> Result<MySqlPool> {
    MySqlPoolOptions::new()
        .max_connections(1)
        .connect(database_url)
        .await
        .context("failed to connect to destination database")
}

#[derive(Clone)]
pub struct MySqlAggregateSink {
    pool: MySqlPool,
}

impl MySqlAggregateSink {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS devices_data_agg (
                device_id VARCHAR(100) NOT NULL,
                `time` DATETIME NULL,
                max_temperature DOUBLE NULL,
                data_points INT NULL,
                total_distance DOUBLE NULL,
                PRIMARY KEY (device_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to create {AGGREGATE_TABLE}"))?;
        tracing::info!(table = AGGREGATE_TABLE, "destination schema ready");
        Ok(())
    }

    /// Drops every stored aggregate and recreates the table.
    pub async fn reset_schema(&self) -> Result<()> {
        sqlx::query("DROP TABLE IF EXISTS devices_data_agg")
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to drop {AGGREGATE_TABLE}"))?;
        tracing::info!(table = AGGREGATE_TABLE, "destination table dropped");
        self.ensure_schema().await
    }
}

impl AggregateSink for MySqlAggregateSink {
    async fn upsert(&self, record: &AggregateRecord) -> AggregateResult<()> {
        // Autocommit: each statement is its own transaction.
        sqlx::query(
            r#"
            INSERT INTO devices_data_agg
                (device_id, `time`, max_temperature, data_points, total_distance)
            VALUES (?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                `time` = VALUES(`time`),
                max_temperature = VALUES(max_temperature),
                data_points = VALUES(data_points),
                total_distance = VALUES(total_distance)
            "#,
        )
        .bind(&record.device_id)
        .bind(record.window_time)
        .bind(record.max_temperature)
        .bind(record.data_points)
        .bind(record.total_distance_km)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
