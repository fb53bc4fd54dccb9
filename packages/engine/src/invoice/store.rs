// packages/engine/src/invoice/store.rs
//! Invoice lookup and transitions keyed by payment hash

use crate::htlc::types::{CircuitKey, Hash, Preimage};
use crate::invoice::state::Invoice;
use crate::invoice::InvoiceError;
use crate::utils::errors::Result;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

/// Invoice persistence seen by the decision engine
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Insert a new invoice; payment hashes are unique
    async fn add(&self, invoice: Invoice) -> Result<()>;

    async fn get(&self, hash: &Hash) -> Result<Invoice>;

    async fn accept(&self, hash: &Hash, htlcs: &[CircuitKey]) -> Result<()>;

    async fn settle(&self, hash: &Hash, preimage: &Preimage, htlcs: &[CircuitKey]) -> Result<()>;

    async fn cancel(&self, hash: &Hash) -> Result<()>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryInvoiceStore {
    invoices: Mutex<HashMap<Hash, Invoice>>,
}

impl MemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.invoices.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.invoices.lock().is_empty()
    }

    fn update<F>(&self, hash: &Hash, f: F) -> Result<()>
    where
        F: FnOnce(&mut Invoice) -> std::result::Result<(), InvoiceError>,
    {
        let mut invoices = self.invoices.lock();
        let invoice = invoices.get_mut(hash).ok_or(InvoiceError::NotFound)?;

        // Guards check before mutating, a rejected transition leaves the record as is.
        f(&mut *invoice)?;

        debug!("Invoice {} moved to {:?}", hash, invoice.state);
        Ok(())
    }
}

#[async_trait]
impl InvoiceStore for MemoryInvoiceStore {
    async fn add(&self, invoice: Invoice) -> Result<()> {
        let mut invoices = self.invoices.lock();
        if invoices.contains_key(&invoice.payment_hash) {
            return Err(InvoiceError::Duplicate.into());
        }

        debug!("Adding invoice {}", invoice.payment_hash);
        invoices.insert(invoice.payment_hash, invoice);

        Ok(())
    }

    async fn get(&self, hash: &Hash) -> Result<Invoice> {
        self.invoices
            .lock()
            .get(hash)
            .cloned()
            .ok_or_else(|| InvoiceError::NotFound.into())
    }

    async fn accept(&self, hash: &Hash, htlcs: &[CircuitKey]) -> Result<()> {
        self.update(hash, |invoice| invoice.accept(htlcs))
    }

    async fn settle(&self, hash: &Hash, preimage: &Preimage, htlcs: &[CircuitKey]) -> Result<()> {
        self.update(hash, |invoice| invoice.settle(preimage, htlcs, Utc::now()))
    }

    async fn cancel(&self, hash: &Hash) -> Result<()> {
        self.update(hash, |invoice| invoice.cancel())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::state::{InvoiceCreationData, InvoiceState};
    use crate::utils::errors::EngineError;
    use std::time::Duration;

    fn invoice(seed: u8) -> Invoice {
        Invoice::new(
            InvoiceCreationData {
                value_msat: 1000,
                payment_preimage: Preimage([seed; 32]),
                payment_addr: [0u8; 32],
                final_cltv_delta: 40,
                expiry: Duration::from_secs(600),
                memo: String::new(),
            },
            None,
        )
    }

    #[tokio::test]
    async fn test_add_and_get() {
        let store = MemoryInvoiceStore::new();
        let inv = invoice(1);
        let hash = inv.payment_hash;

        store.add(inv.clone()).await.unwrap();
        assert_eq!(store.get(&hash).await.unwrap(), inv);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_rejected() {
        let store = MemoryInvoiceStore::new();
        store.add(invoice(1)).await.unwrap();

        let result = store.add(invoice(1)).await;
        assert!(matches!(
            result,
            Err(EngineError::Invoice(InvoiceError::Duplicate))
        ));
    }

    #[tokio::test]
    async fn test_unknown_hash() {
        let store = MemoryInvoiceStore::new();
        let result = store.cancel(&Hash([0u8; 32])).await;
        assert!(matches!(
            result,
            Err(EngineError::Invoice(InvoiceError::NotFound))
        ));
    }

    #[tokio::test]
    async fn test_canceled_invoice_cannot_accept() {
        let store = MemoryInvoiceStore::new();
        let inv = invoice(2);
        let hash = inv.payment_hash;
        store.add(inv).await.unwrap();

        store.cancel(&hash).await.unwrap();
        let result = store.accept(&hash, &[CircuitKey::new(7, 42)]).await;

        assert!(matches!(
            result,
            Err(EngineError::Invoice(InvoiceError::CannotAccept))
        ));
        assert_eq!(store.get(&hash).await.unwrap().state, InvoiceState::Canceled);
    }

    #[tokio::test]
    async fn test_settle_flow() {
        let store = MemoryInvoiceStore::new();
        let inv = invoice(3);
        let hash = inv.payment_hash;
        store.add(inv).await.unwrap();

        let htlcs = [CircuitKey::new(7, 42)];
        store.accept(&hash, &htlcs).await.unwrap();

        let wrong = store.settle(&hash, &Preimage([4u8; 32]), &htlcs).await;
        assert!(matches!(
            wrong,
            Err(EngineError::Invoice(InvoiceError::PreimageMismatch))
        ));
        assert_eq!(store.get(&hash).await.unwrap().state, InvoiceState::Accepted);

        store.settle(&hash, &Preimage([3u8; 32]), &htlcs).await.unwrap();

        let stored = store.get(&hash).await.unwrap();
        assert_eq!(stored.state, InvoiceState::Settled);
        assert!(stored.settled);
        assert!(stored.settle_date.is_some());
    }
}
