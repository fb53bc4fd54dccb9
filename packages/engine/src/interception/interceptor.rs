// packages/engine/src/interception/interceptor.rs
//! Per-node interception engine
//!
//! [`Interceptor::run`] supervises sessions with a fixed retry delay and
//! only returns on cancellation. [`Interceptor::start`] is one session:
//!
//! 1. open the interception stream and the block epoch subscription
//! 2. publish the first epoch as the current height
//! 3. spawn the receive loop and multiplex its errors, block epochs and
//!    queued replies on a single dispatcher
//! 4. on any exit, cancel the session and join the receive loop
//!
//! The dispatcher never waits on the decision engine: replies arrive through
//! a bounded queue that closes itself instead of blocking.

use crate::htlc::types::PubKey;
use crate::interception::channels::{BlockHeight, SharedChannels};
use crate::interception::receive_loop::ReceiveLoop;
use crate::interception::reply_queue::ReplyQueue;
use crate::lnd::proto::routerrpc::ForwardHtlcInterceptResponse;
use crate::lnd::{BlockEpochStream, LndClient, WireSender};
use crate::utils::config::InterceptorConfig;
use crate::utils::errors::{EngineError, Result};
use futures::StreamExt;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Everything the dispatcher can wake up for
#[derive(Debug)]
enum SessionEvent {
    /// The receive loop terminated
    ReceiveError(EngineError),

    /// New best block
    Block(u32),

    /// The block subscription failed or ended
    BlockError(String),

    /// A reply is ready for the wire; `None` once the queue was closed
    Reply(Option<ForwardHtlcInterceptResponse>),

    Cancelled,
}

/// Interception engine for one node
pub struct Interceptor {
    lnd: Arc<dyn LndClient>,
    pub_key: PubKey,
    config: InterceptorConfig,
    channels: SharedChannels,
}

impl Interceptor {
    pub fn new(lnd: Arc<dyn LndClient>, config: InterceptorConfig, channels: SharedChannels) -> Self {
        let pub_key = lnd.pub_key();

        Self {
            lnd,
            pub_key,
            config,
            channels,
        }
    }

    pub fn pub_key(&self) -> PubKey {
        self.pub_key
    }

    /// Run sessions until `cancel` fires, retrying failures forever
    pub async fn run(&self, cancel: CancellationToken) {
        let node = self.pub_key.to_string();

        loop {
            match self.start(&cancel).await {
                Ok(()) => break,
                Err(_) if cancel.is_cancelled() => break,
                Err(e) => {
                    info!("Htlc interceptor error on {}: {}", node, e);
                    metrics::counter!("lnmux_session_failures_total", "node" => node.clone())
                        .increment(1);
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.retry_delay()) => {}
                _ = cancel.cancelled() => break,
            }
        }

        debug!("Exiting interceptor loop for {}", node);
    }

    /// Run a single session
    ///
    /// Returns `Ok(())` when cancelled and an error for every other exit.
    pub async fn start(&self, cancel: &CancellationToken) -> Result<()> {
        let session = cancel.child_token();
        let _guard = session.clone().drop_guard();

        let (wire, requests) = self.lnd.htlc_interceptor(session.clone()).await?;

        debug!("Starting htlc interception on {}", self.pub_key);

        let mut blocks = self.lnd.register_block_epoch_ntfn(session.clone()).await?;

        // The subscription delivers the current tip first.
        let height = tokio::select! {
            _ = session.cancelled() => return Ok(()),

            next = blocks.next() => match next {
                Some(Ok(epoch)) => epoch.height,
                Some(Err(e)) => return Err(EngineError::BlockEpoch(e.to_string())),
                None => return Err(EngineError::BlockEpoch("subscription closed".into())),
            },
        };

        debug!("Initial block height {} on {}", height, self.pub_key);

        if self.publish_height(height, &session).await?.is_break() {
            return Ok(());
        }

        let (reply_queue, mut replies) = ReplyQueue::new(self.config.reply_queue_size);
        let (err_tx, mut err_rx) = mpsc::channel(1);

        let receive_loop = ReceiveLoop::new(
            self.pub_key,
            self.channels.htlc_tx.clone(),
            Arc::clone(&reply_queue),
        );
        let receive_cancel = session.clone();

        let receive_handle = tokio::spawn(async move {
            if let Err(e) = receive_loop.run(requests, receive_cancel).await {
                let _ = err_tx.send(e).await;
            }
        });

        let result = self
            .dispatch(&session, &wire, &mut blocks, &mut replies, &mut err_rx)
            .await;

        session.cancel();
        if let Err(e) = receive_handle.await {
            warn!("Receive loop for {} did not exit cleanly: {}", self.pub_key, e);
        }

        result
    }

    async fn dispatch(
        &self,
        session: &CancellationToken,
        wire: &WireSender,
        blocks: &mut BlockEpochStream,
        replies: &mut mpsc::Receiver<ForwardHtlcInterceptResponse>,
        errors: &mut mpsc::Receiver<EngineError>,
    ) -> Result<()> {
        let node = self.pub_key.to_string();

        loop {
            let event = tokio::select! {
                Some(err) = errors.recv() => SessionEvent::ReceiveError(err),

                next = blocks.next() => match next {
                    Some(Ok(epoch)) => SessionEvent::Block(epoch.height),
                    Some(Err(e)) => SessionEvent::BlockError(e.to_string()),
                    None => SessionEvent::BlockError("subscription closed".into()),
                },

                reply = replies.recv() => SessionEvent::Reply(reply),

                _ = session.cancelled() => SessionEvent::Cancelled,
            };

            match event {
                SessionEvent::ReceiveError(e) => return Err(EngineError::Stream(Box::new(e))),

                SessionEvent::Block(height) => {
                    if self.publish_height(height, session).await?.is_break() {
                        return Ok(());
                    }
                }

                SessionEvent::BlockError(msg) => return Err(EngineError::BlockEpoch(msg)),

                SessionEvent::Reply(Some(resp)) => {
                    wire.send(resp)?;
                    metrics::counter!("lnmux_replies_sent_total", "node" => node.clone())
                        .increment(1);
                }

                // Closed by a replier that found the queue full.
                SessionEvent::Reply(None) => return Err(EngineError::ReplyChannelFull),

                SessionEvent::Cancelled => return Ok(()),
            }
        }
    }

    async fn publish_height(
        &self,
        height: u32,
        session: &CancellationToken,
    ) -> Result<ControlFlow<()>> {
        let update = BlockHeight {
            node: self.pub_key,
            height,
        };

        tokio::select! {
            sent = self.channels.height_tx.send(update) => {
                sent.map_err(|_| EngineError::DownstreamClosed)?;
            }

            _ = session.cancelled() => return Ok(ControlFlow::Break(())),
        }

        metrics::gauge!("lnmux_block_height", "node" => self.pub_key.to_string()).set(height as f64);
        Ok(ControlFlow::Continue(()))
    }
}
