// packages/engine/src/utils/config.rs
//! Engine configuration
//!
//! Configuration is layered: serde defaults, then an optional TOML file
//! (`config/lnmux.toml` unless `LNMUX_CONFIG` points elsewhere), then
//! environment variables prefixed with `LNMUX__` (e.g.
//! `LNMUX__INTERCEPTOR__RETRY_DELAY_MS=500`).

use crate::utils::errors::{EngineError, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config/lnmux";

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Interception engine tuning
    pub interceptor: InterceptorConfig,

    /// Shared process-wide channel sizes
    pub channels: ChannelConfig,

    /// Logging setup
    pub logging: LoggingConfig,

    /// Prometheus exporter setup
    pub metrics: MetricsConfig,

    /// Routing nodes to intercept
    pub nodes: Vec<NodeConfig>,
}

/// Per-engine settings, shared by all nodes
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InterceptorConfig {
    /// Fixed delay between session attempts (milliseconds)
    pub retry_delay_ms: u64,

    /// Capacity of each session's reply queue
    pub reply_queue_size: usize,
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: 1000,
            reply_queue_size: 100,
        }
    }
}

impl InterceptorConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Buffer sizes of the channels shared by every session
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Intercepted HTLC channel towards the decision engine
    pub htlc_buffer: usize,

    /// Block height channel
    pub height_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            htlc_buffer: 1000,
            height_buffer: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,

    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus scrape listener; disabled when absent
    pub listen_addr: Option<SocketAddr>,
}

/// Connection settings for one LND node
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Friendly name used in logs
    #[serde(default)]
    pub name: Option<String>,

    /// gRPC endpoint, e.g. `https://127.0.0.1:10009`
    pub lnd_host: String,

    /// PEM encoded TLS certificate of the node
    pub tls_cert_path: Option<PathBuf>,

    /// Binary macaroon file
    pub macaroon_path: PathBuf,
}

impl EngineConfig {
    /// Load configuration from the default sources
    pub fn load() -> Result<Self> {
        let file = std::env::var("LNMUX_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());
        Self::load_from(&file)
    }

    /// Load configuration from a specific file (extension optional)
    pub fn load_from(file: &str) -> Result<Self> {
        let config: EngineConfig = config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(
                config::Environment::with_prefix("LNMUX")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.interceptor.reply_queue_size == 0 {
            return Err(EngineError::Config(
                "interceptor.reply_queue_size must be positive".into(),
            ));
        }

        if self.channels.htlc_buffer == 0 || self.channels.height_buffer == 0 {
            return Err(EngineError::Config(
                "channel buffers must be positive".into(),
            ));
        }

        let mut hosts = HashSet::new();
        for node in &self.nodes {
            if !hosts.insert(node.lnd_host.as_str()) {
                return Err(EngineError::Config(format!(
                    "duplicate node host: {}",
                    node.lnd_host
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.interceptor.reply_queue_size, 100);
        assert_eq!(config.interceptor.retry_delay(), Duration::from_secs(1));
        assert!(config.nodes.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[interceptor]
retry_delay_ms = 250

[logging]
json = true

[[nodes]]
name = "alice"
lnd_host = "https://127.0.0.1:10009"
macaroon_path = "/tmp/alice.macaroon"
"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = EngineConfig::load_from(&path).unwrap();

        assert_eq!(config.interceptor.retry_delay(), Duration::from_millis(250));
        assert_eq!(config.interceptor.reply_queue_size, 100);
        assert!(config.logging.json);
        assert_eq!(config.nodes.len(), 1);
        assert_eq!(config.nodes[0].name.as_deref(), Some("alice"));
        assert!(config.nodes[0].tls_cert_path.is_none());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = EngineConfig::load_from("/nonexistent/lnmux-config").unwrap();
        assert_eq!(config.channels.htlc_buffer, 1000);
    }

    #[test]
    fn test_rejects_zero_queue() {
        let mut config = EngineConfig::default();
        config.interceptor.reply_queue_size = 0;
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_rejects_duplicate_hosts() {
        let node = NodeConfig {
            name: None,
            lnd_host: "https://127.0.0.1:10009".into(),
            tls_cert_path: None,
            macaroon_path: "/tmp/a".into(),
        };

        let config = EngineConfig {
            nodes: vec![node.clone(), node],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
