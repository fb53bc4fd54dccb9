// packages/engine/src/interception/reply_queue.rs
//! Bounded, closable queue between the decision engine and the wire
//!
//! Every session owns one queue. Replies are pushed without waiting: a push
//! on a full queue closes the queue instead of blocking, so a slow wire can
//! never stall the callers. The dispatcher drains whatever was queued before
//! the close and then ends the session.
//!
//! ```text
//! Replier::reply ──try_send──▶ [ bounded mpsc (cap N) ] ──▶ dispatcher ──▶ wire
//!        │ full                                     │ closed
//!        └──▶ drop sender, ReplyChannelFull         └──▶ "reply channel full"
//! ```

use crate::htlc::intercepted::HtlcResolution;
use crate::htlc::types::CircuitKey;
use crate::lnd::proto::routerrpc::ForwardHtlcInterceptResponse;
use crate::utils::errors::{EngineError, Result};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

/// Default reply queue capacity
pub const DEFAULT_REPLY_QUEUE_SIZE: usize = 100;

/// Sending side of a session's reply queue
pub struct ReplyQueue {
    /// `None` once the queue has been closed
    sender: Mutex<Option<mpsc::Sender<ForwardHtlcInterceptResponse>>>,

    capacity: usize,
}

impl ReplyQueue {
    /// Create a queue holding at most `capacity` replies, at least one
    pub fn new(capacity: usize) -> (Arc<Self>, mpsc::Receiver<ForwardHtlcInterceptResponse>) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);

        let queue = Arc::new(Self {
            sender: Mutex::new(Some(tx)),
            capacity,
        });

        (queue, rx)
    }

    /// Enqueue a reply without waiting
    pub fn push(&self, resp: ForwardHtlcInterceptResponse) -> Result<()> {
        let mut sender = self.sender.lock();

        let Some(tx) = sender.as_ref() else {
            return Err(EngineError::ReplyChannelClosed);
        };

        match tx.try_send(resp) {
            Ok(()) => Ok(()),

            // Close instead of waiting so the dispatcher is never stalled.
            Err(TrySendError::Full(_)) => {
                debug!("Reply queue full at {} entries, closing", self.capacity);
                *sender = None;
                Err(EngineError::ReplyChannelFull)
            }

            Err(TrySendError::Closed(_)) => {
                *sender = None;
                Err(EngineError::ReplyChannelClosed)
            }
        }
    }

    /// Whether the queue stopped accepting replies
    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl fmt::Debug for ReplyQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyQueue")
            .field("capacity", &self.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// One-shot reply capability for a single HTLC
#[derive(Debug)]
pub struct Replier {
    circuit_key: CircuitKey,
    queue: Arc<ReplyQueue>,
}

impl Replier {
    pub fn new(circuit_key: CircuitKey, queue: Arc<ReplyQueue>) -> Self {
        Self { circuit_key, queue }
    }

    /// Send the resolution; consumes the capability
    pub fn reply(self, resolution: HtlcResolution) -> Result<()> {
        self.queue.push(resolution.into_response(self.circuit_key))
    }
}
