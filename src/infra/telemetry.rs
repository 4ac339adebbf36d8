use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register descriptions for the repository metrics with the installed recorder.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "todo_cache_hit_total",
            Unit::Count,
            "Total number of todo list reads served from the cache."
        );
        describe_counter!(
            "todo_cache_miss_total",
            Unit::Count,
            "Total number of todo list reads that fell through to the store."
        );
        describe_counter!(
            "todo_cache_error_total",
            Unit::Count,
            "Total number of cache calls that failed or timed out."
        );
        describe_counter!(
            "todo_cache_decode_error_total",
            Unit::Count,
            "Total number of cached todo lists that could not be decoded."
        );
        describe_counter!(
            "todo_cache_invalidate_total",
            Unit::Count,
            "Total number of owner namespace invalidations."
        );
        describe_counter!(
            "todo_cache_evict_total",
            Unit::Count,
            "Total number of in-process cache evictions due to capacity."
        );
        describe_histogram!(
            "todo_store_query_ms",
            Unit::Milliseconds,
            "Todo store call latency in milliseconds."
        );
    });
}
