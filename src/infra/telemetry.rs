use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter,
    filter::Directive,
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// sqlx logs every statement at info; keep that out unless `RUST_LOG` asks for it.
const QUIET_DEPENDENCIES: &[&str] = &["sqlx::query=warn"];

/// Install a global tracing subscriber using the provided logging settings.
///
/// `RUST_LOG` directives are layered on top of the configured level.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = build_filter(logging)?;

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
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

fn build_filter(logging: &LoggingSettings) -> Result<EnvFilter, InfraError> {
    let mut filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return Ok(filter);
    }
    for directive in QUIET_DEPENDENCIES {
        let directive: Directive = directive.parse().map_err(|err| {
            InfraError::telemetry(format!("invalid log directive `{directive}`: {err}"))
        })?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "roster_cache_record_hit_total",
            Unit::Count,
            "Total number of user records served from the result cache."
        );
        describe_counter!(
            "roster_cache_record_miss_total",
            Unit::Count,
            "Total number of user record lookups that missed the result cache."
        );
        describe_counter!(
            "roster_cache_query_hit_total",
            Unit::Count,
            "Total number of listings served from the result cache."
        );
        describe_counter!(
            "roster_cache_query_miss_total",
            Unit::Count,
            "Total number of listings that missed the result cache."
        );
        describe_counter!(
            "roster_cache_error_total",
            Unit::Count,
            "Total number of failed cache operations, labelled by operation."
        );
        describe_counter!(
            "roster_store_read_total",
            Unit::Count,
            "Total number of reads that reached the record store, labelled by operation."
        );
        describe_histogram!(
            "roster_list_users_ms",
            Unit::Milliseconds,
            "User listing latency in milliseconds."
        );
    });
}
