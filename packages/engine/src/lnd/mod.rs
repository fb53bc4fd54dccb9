// packages/engine/src/lnd/mod.rs
//! Routing daemon wire adapter
//!
//! The interception engine only needs two calls from a node: the
//! bidirectional HTLC interception stream and the block epoch subscription.
//! [`LndClient`] captures exactly that, so the engine can be driven by the
//! gRPC client in production and by `MockLnd` in tests.
//!
//! - **RPC Client**: tonic client with macaroon authentication
//! - **Macaroon**: credential loading and request header injection
//! - **Mock**: in-process adapter scripted through channels (tests and the
//!   `mock` feature)
//! - **Proto**: generated wire messages and service clients

pub mod macaroon;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod proto;
pub mod rpc_client;

use crate::htlc::types::PubKey;
use crate::utils::errors::{EngineError, Result};
use async_trait::async_trait;
use futures::channel::mpsc::UnboundedSender;
use futures::stream::BoxStream;
use proto::chainrpc::BlockEpoch;
use proto::routerrpc::{ForwardHtlcInterceptRequest, ForwardHtlcInterceptResponse};
use tokio_util::sync::CancellationToken;

pub use macaroon::{Macaroon, MacaroonInterceptor};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockLnd, MockSession};
pub use rpc_client::LndRpcClient;

/// Inbound half of the interception stream
pub type RequestStream = BoxStream<'static, Result<ForwardHtlcInterceptRequest>>;

/// Block epochs; the first item is the current tip. An `Err` item or the end
/// of the stream means the subscription failed.
pub type BlockEpochStream = BoxStream<'static, Result<BlockEpoch>>;

/// Outbound half of the interception stream
#[derive(Debug, Clone)]
pub struct WireSender {
    tx: UnboundedSender<ForwardHtlcInterceptResponse>,
}

impl WireSender {
    pub fn new(tx: UnboundedSender<ForwardHtlcInterceptResponse>) -> Self {
        Self { tx }
    }

    /// Write one reply to the stream
    pub fn send(&self, resp: ForwardHtlcInterceptResponse) -> Result<()> {
        self.tx
            .unbounded_send(resp)
            .map_err(|e| EngineError::Send(e.to_string()))
    }
}

/// Interface the engine requires from a routing daemon client
#[async_trait]
pub trait LndClient: Send + Sync {
    /// Identity of the node
    fn pub_key(&self) -> PubKey;

    /// Open the HTLC interception stream
    ///
    /// The stream stays open until both halves are dropped or `cancel` fires.
    async fn htlc_interceptor(
        &self,
        cancel: CancellationToken,
    ) -> Result<(WireSender, RequestStream)>;

    /// Subscribe to block epochs, starting with the current tip
    async fn register_block_epoch_ntfn(&self, cancel: CancellationToken)
        -> Result<BlockEpochStream>;
}
