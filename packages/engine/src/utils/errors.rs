// packages/engine/src/utils/errors.rs
//! Error types for the interception engine
//!
//! Session-level failures are all represented by [`EngineError`]. The
//! supervisor treats every variant as transient: it logs the error, waits
//! the retry delay and opens a new session. Cancellation is never an error.

use crate::invoice::InvoiceError;
use thiserror::Error;

/// Engine error type
#[derive(Debug, Error)]
pub enum EngineError {
    /// The routing daemon rejected or aborted a call
    #[error("rpc error: {0}")]
    Rpc(#[from] tonic::Status),

    /// Connection to the routing daemon could not be established
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// The interception stream ended or its send half was dropped
    #[error("interception stream closed")]
    StreamClosed,

    /// Sending a reply to the wire failed
    #[error("cannot send: {0}")]
    Send(String),

    /// The receive loop terminated with an error
    #[error("stream error: {0}")]
    Stream(Box<EngineError>),

    /// The block epoch subscription failed or ended
    #[error("block error: {0}")]
    BlockEpoch(String),

    /// The node sent a request the engine cannot interpret
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// A payment hash was not 32 bytes long
    #[error("invalid hash length of {0}, want 32")]
    InvalidHash(usize),

    /// A preimage was not 32 bytes long
    #[error("invalid preimage length of {0}, want 32")]
    InvalidPreimage(usize),

    /// A node public key could not be parsed
    #[error("invalid public key: {0}")]
    InvalidPubKey(String),

    /// The reply queue overflowed and was closed
    #[error("reply channel full")]
    ReplyChannelFull,

    /// A reply was attempted on a closed reply queue
    #[error("reply channel closed")]
    ReplyChannelClosed,

    /// The shared downstream channel has no receiver anymore
    #[error("downstream channel closed")]
    DownstreamClosed,

    /// Invoice state transition was rejected
    #[error(transparent)]
    Invoice(#[from] InvoiceError),

    /// Configuration could not be loaded or is invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem access failed (TLS certificate, macaroon)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Hex decoding failed
    #[error("hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl From<config::ConfigError> for EngineError {
    fn from(err: config::ConfigError) -> Self {
        EngineError::Config(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_error_wraps_cause() {
        let err = EngineError::Stream(Box::new(EngineError::InvalidHash(31)));
        assert_eq!(
            err.to_string(),
            "stream error: invalid hash length of 31, want 32"
        );
    }

    #[test]
    fn test_status_conversion() {
        let err: EngineError = tonic::Status::unavailable("node offline").into();
        assert!(matches!(err, EngineError::Rpc(_)));
    }
}
