// packages/engine/src/lnd/rpc_client.rs
//! gRPC implementation of the wire adapter
//!
//! Talks to LND's `Lightning`, `Router` and `ChainNotifier` services over a
//! single TLS channel, with the macaroon attached to every request.

use crate::htlc::types::PubKey;
use crate::lnd::macaroon::{Macaroon, MacaroonInterceptor};
use crate::lnd::proto::chainrpc::chain_notifier_client::ChainNotifierClient;
use crate::lnd::proto::chainrpc::BlockEpoch;
use crate::lnd::proto::lnrpc::lightning_client::LightningClient;
use crate::lnd::proto::lnrpc::GetInfoRequest;
use crate::lnd::proto::routerrpc::router_client::RouterClient;
use crate::lnd::proto::routerrpc::ForwardHtlcInterceptResponse;
use crate::lnd::{BlockEpochStream, LndClient, RequestStream, WireSender};
use crate::utils::config::NodeConfig;
use crate::utils::errors::{EngineError, Result};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tonic::service::interceptor::InterceptedService;
use tonic::transport::{Certificate, Channel, ClientTlsConfig};
use tonic::Request;
use tracing::{debug, info};

type AuthedChannel = InterceptedService<Channel, MacaroonInterceptor>;

/// LND client over gRPC
pub struct LndRpcClient {
    router: RouterClient<AuthedChannel>,
    chain_notifier: ChainNotifierClient<AuthedChannel>,
    pub_key: PubKey,
    alias: String,
}

impl LndRpcClient {
    /// Connect to a node and learn its identity
    pub async fn connect(config: &NodeConfig) -> Result<Self> {
        let macaroon = Macaroon::from_file(&config.macaroon_path).await?;

        let mut endpoint = Channel::from_shared(config.lnd_host.clone())
            .map_err(|e| EngineError::Config(format!("invalid lnd host {}: {}", config.lnd_host, e)))?
            .connect_timeout(Duration::from_secs(10));

        if let Some(path) = &config.tls_cert_path {
            let pem = tokio::fs::read(path).await?;
            endpoint = endpoint.tls_config(ClientTlsConfig::new().ca_certificate(Certificate::from_pem(pem)))?;
        }

        let channel = endpoint.connect().await?;
        let interceptor = MacaroonInterceptor::new(&macaroon)?;

        let mut lightning = LightningClient::with_interceptor(channel.clone(), interceptor.clone());
        let router = RouterClient::with_interceptor(channel.clone(), interceptor.clone());
        let chain_notifier = ChainNotifierClient::with_interceptor(channel, interceptor);

        let info = lightning
            .get_info(Request::new(GetInfoRequest {}))
            .await?
            .into_inner();
        let pub_key: PubKey = info.identity_pubkey.parse()?;

        info!(
            "Connected to {} ({}) running {} at height {}",
            info.alias, pub_key, info.version, info.block_height
        );

        Ok(Self {
            router,
            chain_notifier,
            pub_key,
            alias: info.alias,
        })
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }
}

#[async_trait]
impl LndClient for LndRpcClient {
    fn pub_key(&self) -> PubKey {
        self.pub_key
    }

    async fn htlc_interceptor(
        &self,
        cancel: CancellationToken,
    ) -> Result<(WireSender, RequestStream)> {
        let (tx, rx) = futures::channel::mpsc::unbounded::<ForwardHtlcInterceptResponse>();

        let response = self
            .router
            .clone()
            .htlc_interceptor(Request::new(rx))
            .await?;

        debug!("Htlc interceptor stream opened on {}", self.pub_key);

        let requests = response
            .into_inner()
            .map_err(EngineError::from)
            .take_until(cancel.cancelled_owned())
            .boxed();

        Ok((WireSender::new(tx), requests))
    }

    async fn register_block_epoch_ntfn(
        &self,
        cancel: CancellationToken,
    ) -> Result<BlockEpochStream> {
        // An empty epoch asks for notifications starting at the current tip.
        let response = self
            .chain_notifier
            .clone()
            .register_block_epoch_ntfn(Request::new(BlockEpoch::default()))
            .await?;

        let epochs = response
            .into_inner()
            .map_err(EngineError::from)
            .take_until(cancel.cancelled_owned())
            .boxed();

        Ok(epochs)
    }
}
