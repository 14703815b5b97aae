use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub source_database_url: String,
    pub destination_database_url: String,
    pub source_pool_size: u32,
    pub poll_interval_ms: u64,
    pub connect_retry_ms: u64,
    pub startup_delay_secs: u64,
    pub reset_destination: bool,
    pub otlp_endpoint: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let source_database_url =
            first_non_empty(&["AGGREGATOR_SOURCE_DATABASE_URL", "POSTGRESQL_CS"])
                .context("AGGREGATOR_SOURCE_DATABASE_URL or POSTGRESQL_CS is required")?;
        let destination_database_url =
            first_non_empty(&["AGGREGATOR_DESTINATION_DATABASE_URL", "MYSQL_CS"])
                .context("AGGREGATOR_DESTINATION_DATABASE_URL or MYSQL_CS is required")?;

        let source_pool_size = env::var("AGGREGATOR_SOURCE_POOL_SIZE")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|v| *v != 0)
            .unwrap_or(10);
        let poll_interval_ms = env::var("AGGREGATOR_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1000);
        let connect_retry_ms = env::var("AGGREGATOR_CONNECT_RETRY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(100);
        let startup_delay_secs = env::var("AGGREGATOR_STARTUP_DELAY_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        let reset_destination = env::var("AGGREGATOR_RESET_DESTINATION")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let otlp_endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();

        Ok(Self {
            source_database_url: normalize_database_url(source_database_url),
            destination_database_url: normalize_database_url(destination_database_url),
            source_pool_size,
            poll_interval_ms,
            connect_retry_ms,
            startup_delay_secs,
            reset_destination,
            otlp_endpoint,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn connect_retry_interval(&self) -> Duration {
        Duration::from_millis(self.connect_retry_ms)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }
}

fn first_non_empty(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| env::var(key).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// Strips SQLAlchemy driver suffixes (`postgresql+psycopg2://`,
/// `mysql+pymysql://`) so connection strings written for the Python tooling
/// work unchanged.
fn normalize_database_url(url: String) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url;
    };
    match scheme.split_once('+') {
        Some((base, _driver))
            if matches!(base, "postgresql" | "postgres" | "mysql" | "mariadb") =>
        {
            format!("{base}://{rest}")
        }
        _ => url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_suffixes_are_stripped() {
        assert_eq!(
            normalize_database_url("postgresql+psycopg2://u:p@db:5432/telemetry".to_string()),
            "postgresql://u:p@db:5432/telemetry"
        );
        assert_eq!(
            normalize_database_url("mysql+pymysql://u:p@mysql/analytics?charset=utf8".to_string()),
            "mysql://u:p@mysql/analytics?charset=utf8"
        );
    }

    #[test]
    fn plain_urls_are_untouched() {
        for url in ["postgres://db/x", "mysql://db/y", "not a url", "sqlite+x://file"] {
            assert_eq!(normalize_database_url(url.to_string()), url);
        }
    }
}
