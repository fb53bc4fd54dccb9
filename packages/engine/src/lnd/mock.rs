// packages/engine/src/lnd/mock.rs
//! In-process wire adapter for tests
//!
//! Every successful open of an interception stream plus block subscription
//! yields a [`MockSession`] on the handle returned by [`MockLnd::new`]. The
//! test drives the session by pushing requests and block epochs and reads
//! the replies the engine wrote to the wire.

use crate::htlc::types::PubKey;
use crate::lnd::proto::chainrpc::BlockEpoch;
use crate::lnd::proto::routerrpc::{ForwardHtlcInterceptRequest, ForwardHtlcInterceptResponse};
use crate::lnd::{BlockEpochStream, LndClient, RequestStream, WireSender};
use crate::utils::errors::{EngineError, Result};
use async_trait::async_trait;
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Test side of one mocked session
#[derive(Debug)]
pub struct MockSession {
    /// Feed wire requests (or stream errors) to the engine
    pub requests: UnboundedSender<Result<ForwardHtlcInterceptRequest>>,

    /// Replies the engine sent to the wire
    pub replies: UnboundedReceiver<ForwardHtlcInterceptResponse>,

    /// Feed block epochs (or subscription errors) to the engine
    pub blocks: UnboundedSender<Result<BlockEpoch>>,
}

impl MockSession {
    pub fn send_request(&self, request: ForwardHtlcInterceptRequest) {
        let _ = self.requests.unbounded_send(Ok(request));
    }

    pub fn fail_stream(&self, err: EngineError) {
        let _ = self.requests.unbounded_send(Err(err));
    }

    pub fn send_block(&self, height: u32) {
        let _ = self.blocks.unbounded_send(Ok(BlockEpoch {
            hash: Vec::new(),
            height,
        }));
    }

    pub fn fail_blocks(&self, err: EngineError) {
        let _ = self.blocks.unbounded_send(Err(err));
    }

    /// Wait for the next reply written to the wire
    pub async fn next_reply(&mut self) -> Option<ForwardHtlcInterceptResponse> {
        self.replies.next().await
    }
}

/// Half-open session: interception stream opened, blocks not yet subscribed
struct PendingSession {
    requests: UnboundedSender<Result<ForwardHtlcInterceptRequest>>,
    replies: UnboundedReceiver<ForwardHtlcInterceptResponse>,
}

/// Scriptable [`LndClient`]
pub struct MockLnd {
    pub_key: PubKey,

    /// Number of upcoming interceptor opens that fail
    failing_opens: AtomicUsize,

    /// Number of upcoming block subscriptions that fail
    failing_subscriptions: AtomicUsize,

    /// Height pushed as first epoch of every subscription, zero disables
    initial_height: AtomicU32,

    /// Time of every interceptor open attempt
    open_attempts: Mutex<Vec<Instant>>,

    pending: Mutex<Option<PendingSession>>,

    sessions: mpsc::UnboundedSender<MockSession>,
}

impl MockLnd {
    pub fn new(pub_key: PubKey) -> (Self, mpsc::UnboundedReceiver<MockSession>) {
        let (sessions, sessions_rx) = mpsc::unbounded_channel();

        let mock = Self {
            pub_key,
            failing_opens: AtomicUsize::new(0),
            failing_subscriptions: AtomicUsize::new(0),
            initial_height: AtomicU32::new(0),
            open_attempts: Mutex::new(Vec::new()),
            pending: Mutex::new(None),
            sessions,
        };

        (mock, sessions_rx)
    }

    /// Fail the next `count` interceptor opens
    pub fn fail_opens(&self, count: usize) {
        self.failing_opens.store(count, Ordering::SeqCst);
    }

    /// Fail the next `count` block subscriptions
    pub fn fail_subscriptions(&self, count: usize) {
        self.failing_subscriptions.store(count, Ordering::SeqCst);
    }

    /// Deliver `height` as the first epoch of each new subscription
    pub fn set_initial_height(&self, height: u32) {
        self.initial_height.store(height, Ordering::SeqCst);
    }

    pub fn open_attempts(&self) -> Vec<Instant> {
        self.open_attempts.lock().clone()
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl LndClient for MockLnd {
    fn pub_key(&self) -> PubKey {
        self.pub_key
    }

    async fn htlc_interceptor(
        &self,
        _cancel: CancellationToken,
    ) -> Result<(WireSender, RequestStream)> {
        self.open_attempts.lock().push(Instant::now());

        if Self::take_failure(&self.failing_opens) {
            debug!("Mock failing interceptor open");
            return Err(EngineError::Rpc(tonic::Status::unavailable("mock open failure")));
        }

        let (requests_tx, requests_rx) = unbounded();
        let (replies_tx, replies_rx) = unbounded();

        *self.pending.lock() = Some(PendingSession {
            requests: requests_tx,
            replies: replies_rx,
        });

        Ok((WireSender::new(replies_tx), requests_rx.boxed()))
    }

    async fn register_block_epoch_ntfn(
        &self,
        _cancel: CancellationToken,
    ) -> Result<BlockEpochStream> {
        if Self::take_failure(&self.failing_subscriptions) {
            debug!("Mock failing block subscription");
            return Err(EngineError::BlockEpoch("mock subscription failure".into()));
        }

        let (blocks_tx, blocks_rx) = unbounded();

        let height = self.initial_height.load(Ordering::SeqCst);
        if height > 0 {
            let _ = blocks_tx.unbounded_send(Ok(BlockEpoch {
                hash: Vec::new(),
                height,
            }));
        }

        if let Some(pending) = self.pending.lock().take() {
            let _ = self.sessions.send(MockSession {
                requests: pending.requests,
                replies: pending.replies,
                blocks: blocks_tx,
            });
        }

        Ok(blocks_rx.boxed())
    }
}
