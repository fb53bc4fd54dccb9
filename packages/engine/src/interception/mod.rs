// packages/engine/src/interception/mod.rs
//! HTLC interception layer
//!
//! One [`Interceptor`] runs per connected node. All of them feed the same
//! pair of [`SharedChannels`]:
//!
//! - **Interceptor**: session supervisor and dispatcher
//! - **Receive loop**: wire requests to [`InterceptedHtlc`] events
//! - **Reply queue**: bounded, self-closing path back to the wire
//! - **Channels**: process-wide HTLC and block height streams
//!
//! # Architecture
//!
//! ```text
//! node ──requests──▶ receive loop ──htlcs──▶ decision engine
//!   ▲                                              │
//!   └──── wire ◀── dispatcher ◀── reply queue ◀────┘
//!                     ▲
//! node ──epochs───────┘──heights──▶ decision engine
//! ```
//!
//! [`InterceptedHtlc`]: crate::htlc::InterceptedHtlc

pub mod channels;
pub mod interceptor;
pub(crate) mod receive_loop;
pub mod reply_queue;

// Re-export commonly used types
pub use channels::{BlockHeight, SharedChannels, SharedReceivers};
pub use interceptor::Interceptor;
pub use reply_queue::{Replier, ReplyQueue, DEFAULT_REPLY_QUEUE_SIZE};
