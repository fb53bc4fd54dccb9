// packages/engine/src/lib.rs
//! lnmux HTLC Interception Engine Library
//!
//! Connects to a set of Lightning routing nodes, intercepts every HTLC they
//! would forward and funnels them, together with each node's block height,
//! into one shared pair of channels. Resolutions travel back to the node
//! that reported the HTLC.
//!
//! # Architecture
//!
//! The engine is structured into several key modules:
//!
//! - **lnd**: routing daemon wire adapter (gRPC client and test mock)
//! - **interception**: per-node session supervisor, receive loop, reply queue
//! - **htlc**: intercepted HTLCs, resolutions and value types
//! - **invoice**: invoice lifecycle and store
//! - **observability**: tracing and metrics setup
//! - **utils**: configuration and error types

// Public module exports
pub mod htlc;
pub mod interception;
pub mod invoice;
pub mod lnd;
pub mod observability;
pub mod utils;

// Re-export commonly used types
pub use htlc::{CircuitKey, Hash, HtlcResolution, InterceptedHtlc, Preimage, PubKey};
pub use interception::{BlockHeight, Interceptor, SharedChannels, SharedReceivers};
pub use lnd::{LndClient, LndRpcClient};
pub use utils::config::EngineConfig;
pub use utils::errors::{EngineError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
