use crate::config::Config;
use crate::model::{RelayError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

const DEFAULT_FILTER: &str = "cursor_relay=debug,tower_http=debug,axum::rejection=trace,warn";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn fmt_layer<S>(json: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true);
    if json {
        layer.json().boxed()
    } else {
        layer.with_ansi(true).boxed()
    }
}

pub fn init_telemetry(config: &Config) -> Result<()> {
    #[cfg(feature = "telemetry")]
    if config.telemetry {
        return init_with_jaeger(config);
    }

    Registry::default()
        .with(env_filter())
        .with(fmt_layer(config.log_json))
        .try_init()
        .map_err(|e| RelayError::InternalError(format!("Failed to initialize tracing: {e}")))?;

    if config.telemetry {
        tracing::warn!("Telemetry requested but the `telemetry` feature is not enabled");
    } else {
        tracing::info!("Telemetry disabled");
    }
    Ok(())
}

#[cfg(feature = "telemetry")]
fn init_with_jaeger(config: &Config) -> Result<()> {
    use opentelemetry::sdk::propagation::TraceContextPropagator;
    use opentelemetry::sdk::{
        trace::{self, RandomIdGenerator, Sampler},
        Resource,
    };
    use opentelemetry::{global, KeyValue};

    global::set_text_map_propagator(TraceContextPropagator::new());

    let tracer = opentelemetry_jaeger::new_collector_pipeline()
        .with_service_name("cursor-relay")
        .with_endpoint(&config.jaeger_endpoint)
        .with_isahc()
        .with_trace_config(
            trace::config()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default())
                .with_max_events_per_span(64)
                .with_max_attributes_per_span(16)
                .with_resource(Resource::new(vec![
                    KeyValue::new("service.name", "cursor-relay"),
                    KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                ])),
        )
        .with_timeout(std::time::Duration::from_secs(2))
        .install_batch(opentelemetry::runtime::Tokio)
        .map_err(|e| RelayError::InternalError(format!("Failed to install tracer: {e}")))?;

    let telemetry = tracing_opentelemetry::layer().with_tracer(tracer);

    Registry::default()
        .with(env_filter())
        .with(fmt_layer(config.log_json))
        .with(telemetry)
        .try_init()
        .map_err(|e| RelayError::InternalError(format!("Failed to initialize tracing: {e}")))?;

    tracing::info!(
        "Telemetry initialized with Jaeger endpoint: {}",
        config.jaeger_endpoint
    );
    Ok(())
}

pub fn shutdown_telemetry(config: &Config) {
    #[cfg(feature = "telemetry")]
    if config.telemetry {
        // Flush pending spans.
        opentelemetry::global::shutdown_tracer_provider();
    }
    #[cfg(not(feature = "telemetry"))]
    let _ = config;
}
