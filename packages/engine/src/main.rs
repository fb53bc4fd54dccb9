// packages/engine/src/main.rs
//! lnmux HTLC Interception Engine
//!
//! Runs one interception engine per configured node. Without a decision
//! engine attached, every intercepted HTLC is resumed unless already
//! expired, and every block height is logged.

use anyhow::{Context, Result};
use lnmux_engine::htlc::{FailureCode, HtlcResolution, PubKey};
use lnmux_engine::interception::{Interceptor, SharedChannels, SharedReceivers};
use lnmux_engine::lnd::{LndClient, LndRpcClient};
use lnmux_engine::observability::{init_metrics, init_tracing};
use lnmux_engine::utils::config::EngineConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = EngineConfig::load().context("loading configuration")?;

    // Initialize observability (tracing, metrics)
    init_tracing(&config.logging)?;
    init_metrics(&config.metrics)?;

    info!("Starting lnmux interception engine v{}", env!("CARGO_PKG_VERSION"));

    if config.nodes.is_empty() {
        anyhow::bail!("no nodes configured");
    }

    let (channels, receivers) =
        SharedChannels::new(config.channels.htlc_buffer, config.channels.height_buffer);

    let mut interceptors = Vec::with_capacity(config.nodes.len());
    for node in &config.nodes {
        let label = node.name.as_deref().unwrap_or(&node.lnd_host);
        let client = LndRpcClient::connect(node)
            .await
            .with_context(|| format!("connecting to {}", label))?;

        info!("Node {} is {} ({})", label, client.pub_key(), client.alias());

        interceptors.push(Interceptor::new(
            Arc::new(client),
            config.interceptor.clone(),
            channels.clone(),
        ));
    }

    // Engines hold the only senders from here on
    drop(channels);

    let cancel = CancellationToken::new();
    let mut tasks = JoinSet::new();

    for interceptor in interceptors {
        let cancel = cancel.clone();
        tasks.spawn(async move { interceptor.run(cancel).await });
    }

    let passthrough = tokio::spawn(passthrough(receivers, cancel.clone()));

    tokio::signal::ctrl_c()
        .await
        .context("installing CTRL+C signal handler")?;
    info!("Received shutdown signal, cleaning up...");

    cancel.cancel();

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!("Interceptor task failed: {}", e);
        }
    }

    if let Err(e) = passthrough.await {
        error!("Passthrough task failed: {}", e);
    }

    info!("Engine stopped");
    Ok(())
}

/// Resolve every HTLC and log every height until cancelled
///
/// HTLCs whose outgoing expiry is already reached at the node's last known
/// height are failed back instead of being forwarded.
async fn passthrough(mut receivers: SharedReceivers, cancel: CancellationToken) {
    let mut heights: HashMap<PubKey, u32> = HashMap::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            Some(htlc) = receivers.htlcs.recv() => {
                let height = heights.get(&htlc.source).copied().unwrap_or_default();
                let blocks_left = htlc.blocks_until_expiry(height);

                debug!(
                    "Htlc {} from {} ({} msat, fee {} msat, {} blocks to expiry)",
                    htlc.circuit_key, htlc.source, htlc.amount_msat, htlc.fee_msat(), blocks_left
                );

                let resolution = if blocks_left == 0 {
                    HtlcResolution::fail(FailureCode::ExpiryTooSoon)
                } else {
                    HtlcResolution::Resume
                };

                if let Err(e) = htlc.reply(resolution) {
                    warn!("Cannot resolve htlc: {}", e);
                }
            }

            Some(update) = receivers.heights.recv() => {
                info!("Block height {} on {}", update.height, update.node);
                heights.insert(update.node, update.height);
            }

            else => break,
        }
    }
}
