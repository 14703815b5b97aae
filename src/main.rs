mod aggregate;
mod config;
mod error;
mod geo;
mod reading;
mod store;
mod window;

use crate::aggregate::Aggregator;
use crate::config::Config;
use crate::store::{
    connect_destination, connect_source_with_retry, MySqlAggregateSink, PgReadingSource,
};
use anyhow::Result;
use tokio_util::sync::CancellationToken;

fn init_tracing(config: &Config) -> Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{runtime::Tokio, trace::Config as OTelTraceConfig, Resource};
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,device_aggregator=info".into());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true);

    if let Some(endpoint) = &config.otlp_endpoint {
        let endpoint = normalize_otlp_http_endpoint(endpoint);
        let exporter = opentelemetry_otlp::new_exporter()
            .http()
            .with_endpoint(endpoint);
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(exporter)
            .with_trace_config(OTelTraceConfig::default().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "device-aggregator"),
            ])))
            .install_batch(Tokio)?;

        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}

fn normalize_otlp_http_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.contains("/v1/traces") {
        return trimmed.to_string();
    }
    format!("{}/v1/traces", trimmed.trim_end_matches('/'))
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = wait_for_ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler");
                wait_for_ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        wait_for_ctrl_c().await;
    }
}

/// Never resolves if the handler cannot be installed, so the loop keeps running.
async fn wait_for_ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c; shutdown by signal disabled");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config)?;

    if !config.startup_delay().is_zero() {
        tracing::info!(seconds = config.startup_delay_secs, "waiting before connecting to source");
        tokio::time::sleep(config.startup_delay()).await;
    }

    let source_pool = connect_source_with_retry(
        &config.source_database_url,
        config.source_pool_size,
        config.connect_retry_interval(),
    )
    .await?;
    let destination_pool = connect_destination(&config.destination_database_url).await?;

    let sink = MySqlAggregateSink::new(destination_pool);
    if config.reset_destination {
        sink.reset_schema().await?;
    } else {
        sink.ensure_schema().await?;
    }

    let aggregator = Aggregator::new(PgReadingSource::new(source_pool), sink);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown signal received; stopping after current pass");
        signal_cancel.cancel();
    });

    tracing::info!(
        poll_interval_ms = config.poll_interval_ms,
        "aggregation loop starting"
    );
    aggregator.run(config.poll_interval(), cancel).await?;

    Ok(())
}
