// packages/engine/src/interception/receive_loop.rs
//! Inbound half of a session
//!
//! Drains wire requests, turns each into an [`InterceptedHtlc`] carrying a
//! replier bound to the session's reply queue, and hands it downstream in
//! wire order. Returns `Ok(())` only on cancellation.

use crate::htlc::intercepted::InterceptedHtlc;
use crate::htlc::types::{CircuitKey, Hash, PubKey};
use crate::interception::reply_queue::{Replier, ReplyQueue};
use crate::lnd::proto::routerrpc::ForwardHtlcInterceptRequest;
use crate::lnd::RequestStream;
use crate::utils::errors::{EngineError, Result};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

pub(crate) struct ReceiveLoop {
    source: PubKey,
    htlc_tx: mpsc::Sender<InterceptedHtlc>,
    reply_queue: Arc<ReplyQueue>,
}

impl ReceiveLoop {
    pub(crate) fn new(
        source: PubKey,
        htlc_tx: mpsc::Sender<InterceptedHtlc>,
        reply_queue: Arc<ReplyQueue>,
    ) -> Self {
        Self {
            source,
            htlc_tx,
            reply_queue,
        }
    }

    pub(crate) async fn run(
        self,
        mut requests: RequestStream,
        cancel: CancellationToken,
    ) -> Result<()> {
        let node = self.source.to_string();

        loop {
            let request = tokio::select! {
                biased;

                _ = cancel.cancelled() => return Ok(()),

                next = requests.next() => match next {
                    Some(Ok(request)) => request,
                    Some(Err(e)) => return Err(e),
                    None => return Err(EngineError::StreamClosed),
                },
            };

            let htlc = self.translate(request)?;
            trace!("Intercepted htlc {} hash {}", htlc.circuit_key, htlc.hash);

            tokio::select! {
                biased;

                _ = cancel.cancelled() => return Ok(()),

                sent = self.htlc_tx.send(htlc) => {
                    sent.map_err(|_| EngineError::DownstreamClosed)?;
                }
            }

            metrics::counter!("lnmux_htlcs_intercepted_total", "node" => node.clone()).increment(1);
        }
    }

    fn translate(&self, request: ForwardHtlcInterceptRequest) -> Result<InterceptedHtlc> {
        let hash = Hash::from_slice(&request.payment_hash)?;

        let circuit_key: CircuitKey = request
            .incoming_circuit_key
            .clone()
            .ok_or_else(|| EngineError::Protocol("missing incoming circuit key".into()))?
            .into();

        Ok(InterceptedHtlc::from_request(
            self.source,
            circuit_key,
            hash,
            request,
            Replier::new(circuit_key, Arc::clone(&self.reply_queue)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::htlc::intercepted::HtlcResolution;
    use crate::lnd::proto::routerrpc;
    use futures::channel::mpsc::unbounded;
    use std::time::Duration;

    fn test_pubkey() -> PubKey {
        format!("03{}", "aa".repeat(32)).parse().unwrap()
    }

    fn request(htlc_id: u64, hash_len: usize) -> ForwardHtlcInterceptRequest {
        ForwardHtlcInterceptRequest {
            incoming_circuit_key: Some(routerrpc::CircuitKey {
                chan_id: 7,
                htlc_id,
            }),
            payment_hash: vec![1u8; hash_len],
            onion_blob: vec![0xde, 0xad],
            outgoing_amount_msat: 1000,
            outgoing_expiry: 800_000,
            outgoing_requested_chan_id: 99,
            incoming_amount_msat: 1010,
            incoming_expiry: 800_040,
            custom_records: [(65_536, vec![1, 2, 3])].into_iter().collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_translates_requests_in_order() {
        let (queue, mut replies) = ReplyQueue::new(10);
        let (htlc_tx, mut htlcs) = mpsc::channel(10);
        let (wire_tx, wire_rx) = unbounded();

        for id in 0..3 {
            wire_tx.unbounded_send(Ok(request(id, 32))).unwrap();
        }
        drop(wire_tx);

        let receive_loop = ReceiveLoop::new(test_pubkey(), htlc_tx, queue);
        let result = receive_loop.run(wire_rx.boxed(), CancellationToken::new()).await;
        assert!(matches!(result, Err(EngineError::StreamClosed)));

        for id in 0..3 {
            let htlc = htlcs.recv().await.unwrap();
            assert_eq!(htlc.circuit_key, CircuitKey::new(7, id));
            assert_eq!(htlc.source, test_pubkey());
            assert_eq!(htlc.hash, Hash([1u8; 32]));
            assert_eq!(htlc.onion_blob, vec![0xde, 0xad]);
            assert_eq!(htlc.amount_msat, 1000);
            assert_eq!(htlc.expiry, 800_000);
            assert_eq!(htlc.outgoing_chan_id, 99);
            assert_eq!(htlc.incoming_amount_msat, 1010);
            assert_eq!(htlc.incoming_expiry, 800_040);
            assert_eq!(htlc.custom_records.get(&65_536), Some(&vec![1, 2, 3]));

            htlc.reply(HtlcResolution::Resume).unwrap();
        }

        for id in 0..3 {
            let resp = replies.recv().await.unwrap();
            assert_eq!(resp.incoming_circuit_key.unwrap().htlc_id, id);
        }
    }

    #[tokio::test]
    async fn test_malformed_hash_stops_loop() {
        let (queue, _replies) = ReplyQueue::new(10);
        let (htlc_tx, mut htlcs) = mpsc::channel(10);
        let (wire_tx, wire_rx) = unbounded();

        wire_tx.unbounded_send(Ok(request(1, 31))).unwrap();
        wire_tx.unbounded_send(Ok(request(2, 32))).unwrap();

        let receive_loop = ReceiveLoop::new(test_pubkey(), htlc_tx, queue);
        let result = receive_loop.run(wire_rx.boxed(), CancellationToken::new()).await;

        assert!(matches!(result, Err(EngineError::InvalidHash(31))));
        // Nothing delivered, not even the valid request behind it
        assert!(htlcs.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_missing_circuit_key_is_protocol_error() {
        let (queue, _replies) = ReplyQueue::new(10);
        let (htlc_tx, _htlcs) = mpsc::channel(10);
        let (wire_tx, wire_rx) = unbounded();

        let mut req = request(1, 32);
        req.incoming_circuit_key = None;
        wire_tx.unbounded_send(Ok(req)).unwrap();

        let receive_loop = ReceiveLoop::new(test_pubkey(), htlc_tx, queue);
        let result = receive_loop.run(wire_rx.boxed(), CancellationToken::new()).await;
        assert!(matches!(result, Err(EngineError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_cancel_while_blocked_on_recv() {
        let (queue, _replies) = ReplyQueue::new(10);
        let (htlc_tx, _htlcs) = mpsc::channel(10);
        let (_wire_tx, wire_rx) = unbounded::<Result<ForwardHtlcInterceptRequest>>();

        let cancel = CancellationToken::new();
        let receive_loop = ReceiveLoop::new(test_pubkey(), htlc_tx, queue);
        let handle = tokio::spawn(receive_loop.run(wire_rx.boxed(), cancel.clone()));

        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_while_blocked_on_downstream() {
        let (queue, _replies) = ReplyQueue::new(10);
        // Downstream holds one event and nobody reads it
        let (htlc_tx, _htlcs) = mpsc::channel(1);
        let (wire_tx, wire_rx) = unbounded();

        wire_tx.unbounded_send(Ok(request(1, 32))).unwrap();
        wire_tx.unbounded_send(Ok(request(2, 32))).unwrap();

        let cancel = CancellationToken::new();
        let receive_loop = ReceiveLoop::new(test_pubkey(), htlc_tx, queue);
        let handle = tokio::spawn(receive_loop.run(wire_rx.boxed(), cancel.clone()));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_finished());
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
