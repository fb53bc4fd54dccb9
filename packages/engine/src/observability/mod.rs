// packages/engine/src/observability/mod.rs
//! Logging and metrics setup
//!
//! Metrics emitted by the engine, all labelled with the node public key:
//!
//! - `lnmux_htlcs_intercepted_total`: HTLCs handed downstream
//! - `lnmux_replies_sent_total`: replies written to the wire
//! - `lnmux_session_failures_total`: sessions ended by an error
//! - `lnmux_block_height`: last published block height

use crate::utils::config::{LoggingConfig, MetricsConfig};
use crate::utils::errors::{EngineError, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| EngineError::Config(format!("invalid log filter: {}", e)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| EngineError::Config(format!("cannot install subscriber: {}", e)))
}

/// Install the Prometheus recorder when a listen address is configured
pub fn init_metrics(config: &MetricsConfig) -> Result<()> {
    let Some(addr) = config.listen_addr else {
        return Ok(());
    };

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| EngineError::Config(format!("cannot start metrics exporter: {}", e)))?;

    describe_metrics();
    info!("Serving metrics on {}", addr);

    Ok(())
}

fn describe_metrics() {
    metrics::describe_counter!(
        "lnmux_htlcs_intercepted_total",
        "HTLCs handed to the decision engine"
    );
    metrics::describe_counter!(
        "lnmux_replies_sent_total",
        "Resolutions written to the interception stream"
    );
    metrics::describe_counter!(
        "lnmux_session_failures_total",
        "Interception sessions that ended with an error"
    );
    metrics::describe_gauge!("lnmux_block_height", "Last block height reported by the node");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_disabled_without_address() {
        assert!(init_metrics(&MetricsConfig::default()).is_ok());
    }
}
