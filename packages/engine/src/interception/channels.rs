// packages/engine/src/interception/channels.rs
//! Process-wide channels shared by every interception session
//!
//! Created once at startup and cloned into each [`Interceptor`]. The
//! receivers go to the decision engine.
//!
//! [`Interceptor`]: crate::interception::Interceptor

use crate::htlc::intercepted::InterceptedHtlc;
use crate::htlc::types::PubKey;
use tokio::sync::mpsc;

/// Best block height reported by a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeight {
    pub node: PubKey,
    pub height: u32,
}

/// Sending halves, one clone per engine
#[derive(Debug, Clone)]
pub struct SharedChannels {
    pub htlc_tx: mpsc::Sender<InterceptedHtlc>,
    pub height_tx: mpsc::Sender<BlockHeight>,
}

/// Receiving halves, owned by the decision engine
#[derive(Debug)]
pub struct SharedReceivers {
    pub htlcs: mpsc::Receiver<InterceptedHtlc>,
    pub heights: mpsc::Receiver<BlockHeight>,
}

impl SharedChannels {
    pub fn new(htlc_buffer: usize, height_buffer: usize) -> (Self, SharedReceivers) {
        let (htlc_tx, htlcs) = mpsc::channel(htlc_buffer);
        let (height_tx, heights) = mpsc::channel(height_buffer);

        (
            Self { htlc_tx, height_tx },
            SharedReceivers { htlcs, heights },
        )
    }
}
