//! Logging and OpenTelemetry initialization
//!
//! Console output is JSON or human-readable, optionally mirrored to a rolling
//! file. When enabled, spans are exported over OTLP.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    trace::{Sampler, TracerProvider},
    Resource,
};
use std::fs;
use std::time::Duration;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Keeps the file writer flushing and shuts tracing export down on drop.
/// Hold it for the lifetime of the process.
pub struct TelemetryGuard {
    _file_guard: Option<WorkerGuard>,
}

pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<TelemetryGuard> {
    let mut otel_init_error: Option<String> = None;
    let tracer_provider = if config.opentelemetry_enabled {
        match init_tracer_provider(config) {
            Ok(provider) => Some(provider),
            Err(e) => {
                otel_init_error = Some(e.to_string());
                None
            }
        }
    } else {
        None
    };

    let env_filter = build_env_filter(&config.level);

    let file_guard = match &tracer_provider {
        Some(provider) => {
            let otel_layer = tracing_opentelemetry::layer()
                .with_tracer(provider.tracer("folio-server"))
                .with_tracked_inactivity(true);
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(otel_layer);
            install_output_layers(subscriber, config)?
        }
        None => {
            let subscriber = tracing_subscriber::registry().with(env_filter);
            install_output_layers(subscriber, config)?
        }
    };

    if let Some(provider) = tracer_provider {
        global::set_tracer_provider(provider);
    }

    if let Some(err) = otel_init_error {
        tracing::warn!(
            error = %err,
            "Failed to initialize OpenTelemetry tracer provider, continuing without OpenTelemetry"
        );
    }

    tracing::info!(
        otel_enabled = config.opentelemetry_enabled,
        json = config.json,
        service_name = %config.service_name,
        environment = %config.deployment_environment,
        "Logging initialized"
    );

    Ok(TelemetryGuard {
        _file_guard: file_guard,
    })
}

fn init_tracer_provider(config: &LoggingConfig) -> anyhow::Result<TracerProvider> {
    use opentelemetry_sdk::trace::Config;

    let service_version = config
        .service_version
        .clone()
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
    let resource = Resource::new(vec![
        KeyValue::new("service.name", config.service_name.clone()),
        KeyValue::new("service.version", service_version),
        KeyValue::new(
            "deployment.environment",
            config.deployment_environment.clone(),
        ),
    ]);

    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(&config.otlp_endpoint)
        .with_timeout(Duration::from_secs(config.otlp_timeout_seconds))
        .build_span_exporter()
        .map_err(|e| anyhow::anyhow!("Failed to create OTLP exporter: {}", e))?;

    let sampler = match config.trace_sample_ratio {
        r if r >= 1.0 => Sampler::AlwaysOn,
        r if r <= 0.0 => Sampler::AlwaysOff,
        r => Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(r))),
    };

    Ok(TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_config(
            Config::default()
                .with_sampler(sampler)
                .with_resource(resource),
        )
        .build())
}

/// `RUST_LOG` wins; otherwise our crates log at `level` and sqlx stays quiet.
fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "folio_server={level},folio={level},tower_http=info,sqlx=warn"
        ))
    })
}

fn install_output_layers<S>(
    subscriber: S,
    config: &LoggingConfig,
) -> anyhow::Result<Option<WorkerGuard>>
where
    S: SubscriberExt + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    let file = if config.file_enabled {
        Some(create_file_appender(config)?)
    } else {
        None
    };

    if config.json {
        let console = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(std::io::stdout);
        match file {
            Some((writer, guard)) => {
                let file_layer = fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(writer);
                subscriber.with(console).with(file_layer).init();
                Ok(Some(guard))
            }
            None => {
                subscriber.with(console).init();
                Ok(None)
            }
        }
    } else {
        let console = fmt::layer().with_target(true).with_writer(std::io::stdout);
        match file {
            Some((writer, guard)) => {
                let file_layer = fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(writer);
                subscriber.with(console).with(file_layer).init();
                Ok(Some(guard))
            }
            None => {
                subscriber.with(console).init();
                Ok(None)
            }
        }
    }
}

fn create_file_appender(config: &LoggingConfig) -> anyhow::Result<(NonBlocking, WorkerGuard)> {
    fs::create_dir_all(&config.file_directory)?;

    let dir = &config.file_directory;
    let prefix = &config.file_prefix;
    let appender = match config.file_rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(dir, prefix),
        "minutely" => tracing_appender::rolling::minutely(dir, prefix),
        "never" => tracing_appender::rolling::never(dir, format!("{prefix}.log")),
        _ => tracing_appender::rolling::daily(dir, prefix),
    };

    Ok(tracing_appender::non_blocking(appender))
}

/// Flush and stop span export. Also runs when the guard drops.
pub fn shutdown_telemetry() {
    tracing::info!("Shutting down OpenTelemetry...");
    global::shutdown_tracer_provider();
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        shutdown_telemetry();
    }
}
