use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

pub(crate) const METRIC_QUEUE_LEN: &str = "reading_analytics_queue_len";
pub(crate) const METRIC_EVENT_DROPPED: &str = "reading_analytics_event_dropped_total";
pub(crate) const METRIC_DELIVERED: &str = "reading_analytics_delivered_total";
pub(crate) const METRIC_DELIVERY_FAILED: &str = "reading_analytics_delivery_failed_total";
pub(crate) const METRIC_DELIVER_MS: &str = "reading_analytics_deliver_ms";

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    // Stderr keeps stdout free for command output such as replay reports.
    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
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

/// Register descriptions for the analytics pipeline metrics. Idempotent.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_gauge!(
            METRIC_QUEUE_LEN,
            Unit::Count,
            "Current number of analytics events waiting for delivery."
        );
        describe_counter!(
            METRIC_EVENT_DROPPED,
            Unit::Count,
            "Total number of analytics events dropped due to queue overflow."
        );
        describe_counter!(
            METRIC_DELIVERED,
            Unit::Count,
            "Total number of analytics events accepted by the endpoint."
        );
        describe_counter!(
            METRIC_DELIVERY_FAILED,
            Unit::Count,
            "Total number of analytics events dropped after a failed delivery."
        );
        describe_histogram!(
            METRIC_DELIVER_MS,
            Unit::Milliseconds,
            "Analytics delivery pass latency in milliseconds."
        );
    });
}
