// packages/engine/src/htlc/mod.rs
//! HTLC data model
//!
//! - **Types**: circuit keys, payment hashes, preimages, node keys
//! - **Intercepted**: the event handed to the decision engine and the
//!   resolutions it can send back

pub mod intercepted;
pub mod types;

pub use crate::lnd::proto::lnrpc::failure::FailureCode;
pub use intercepted::{HtlcResolution, InterceptedHtlc};
pub use types::{CircuitKey, Hash, Preimage, PubKey};
