// packages/engine/src/htlc/intercepted.rs
//! Intercepted HTLCs and their resolutions
//!
//! An [`InterceptedHtlc`] is handed to the decision engine exactly once per
//! wire request. Resolving it consumes the value, so a second reply for the
//! same HTLC does not type-check.

use crate::htlc::types::{CircuitKey, Hash, Preimage, PubKey};
use crate::interception::reply_queue::Replier;
use crate::lnd::proto::lnrpc::failure::FailureCode;
use crate::lnd::proto::routerrpc::{
    ForwardHtlcInterceptRequest, ForwardHtlcInterceptResponse, ResolveHoldForwardAction,
};
use crate::utils::errors::Result;
use std::collections::HashMap;

/// Outcome chosen by the decision engine for one HTLC
#[derive(Debug, Clone, PartialEq)]
pub enum HtlcResolution {
    /// Settle with the preimage of the payment hash
    Settle { preimage: Preimage },

    /// Fail back with a failure code and an opaque, already encoded message
    Fail {
        failure_code: FailureCode,
        failure_message: Vec<u8>,
    },

    /// Let the node continue forwarding
    Resume,
}

impl HtlcResolution {
    pub fn fail(failure_code: FailureCode) -> Self {
        HtlcResolution::Fail {
            failure_code,
            failure_message: Vec::new(),
        }
    }

    /// Build the wire reply for the HTLC identified by `circuit_key`
    pub fn into_response(self, circuit_key: CircuitKey) -> ForwardHtlcInterceptResponse {
        let mut resp = ForwardHtlcInterceptResponse {
            incoming_circuit_key: Some(circuit_key.into()),
            ..Default::default()
        };

        match self {
            HtlcResolution::Settle { preimage } => {
                resp.set_action(ResolveHoldForwardAction::Settle);
                resp.preimage = preimage.as_bytes().to_vec();
            }
            HtlcResolution::Fail {
                failure_code,
                failure_message,
            } => {
                resp.set_action(ResolveHoldForwardAction::Fail);
                resp.set_failure_code(failure_code);
                resp.failure_message = failure_message;
            }
            HtlcResolution::Resume => {
                resp.set_action(ResolveHoldForwardAction::Resume);
            }
        }

        resp
    }
}

/// One pending forwarding decision
#[derive(Debug)]
pub struct InterceptedHtlc {
    /// Node that reported the HTLC
    pub source: PubKey,

    /// Incoming circuit key, echoed back in the reply
    pub circuit_key: CircuitKey,

    /// Payment hash
    pub hash: Hash,

    /// Onion routing payload, untouched
    pub onion_blob: Vec<u8>,

    /// Outgoing amount (millisatoshi)
    pub amount_msat: u64,

    /// Outgoing expiry block height
    pub expiry: u32,

    /// Requested outgoing channel, zero when unspecified
    pub outgoing_chan_id: u64,

    /// Amount offered on the incoming channel (millisatoshi)
    pub incoming_amount_msat: u64,

    /// Expiry height of the incoming HTLC
    pub incoming_expiry: u32,

    /// TLV records sent by the payer, keyed by type
    pub custom_records: HashMap<u64, Vec<u8>>,

    replier: Replier,
}

impl InterceptedHtlc {
    /// Build the event for a wire request whose hash and circuit key were
    /// already validated
    pub(crate) fn from_request(
        source: PubKey,
        circuit_key: CircuitKey,
        hash: Hash,
        request: ForwardHtlcInterceptRequest,
        replier: Replier,
    ) -> Self {
        Self {
            source,
            circuit_key,
            hash,
            onion_blob: request.onion_blob,
            amount_msat: request.outgoing_amount_msat,
            expiry: request.outgoing_expiry,
            outgoing_chan_id: request.outgoing_requested_chan_id,
            incoming_amount_msat: request.incoming_amount_msat,
            incoming_expiry: request.incoming_expiry,
            custom_records: request.custom_records,
            replier,
        }
    }

    /// Routing fee offered to this node (millisatoshi)
    pub fn fee_msat(&self) -> u64 {
        self.incoming_amount_msat.saturating_sub(self.amount_msat)
    }

    /// Resolve this HTLC
    ///
    /// Never blocks. Fails with `ReplyChannelFull` when this reply overflowed
    /// the session's reply queue (the queue is closed as a result), and with
    /// `ReplyChannelClosed` when the queue was already closed or the session
    /// is gone.
    pub fn reply(self, resolution: HtlcResolution) -> Result<()> {
        self.replier.reply(resolution)
    }

    /// Blocks left until the outgoing expiry, zero when already reached
    pub fn blocks_until_expiry(&self, height: u32) -> u32 {
        self.expiry.saturating_sub(height)
    }
}
