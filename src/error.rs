use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("store query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("device {device_id} has a malformed location: {source}")]
    MalformedLocation {
        device_id: String,
        #[source]
        source: simd_json::Error,
    },
    #[error("device {device_id} has a non-integer timestamp {raw:?}")]
    InvalidTimestamp { device_id: String, raw: String },
    #[error("timestamp {0} is outside the representable range")]
    TimestampOutOfRange(i64),
}

pub type AggregateResult<T> = Result<T, AggregateError>;
