// packages/engine/src/invoice/state.rs
//! Invoice record and lifecycle
//!
//! Invoices are never deleted. Settled and canceled are terminal states; the
//! `settled` flag and `settle_date` are set together on settlement.

use crate::htlc::types::{CircuitKey, Hash, Preimage};
use crate::invoice::InvoiceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceState {
    Open,
    Accepted,
    Settled,
    Canceled,
}

impl InvoiceState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceState::Settled | InvoiceState::Canceled)
    }
}

/// Parameters fixed when the invoice is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCreationData {
    /// Requested amount (msat)
    pub value_msat: u64,

    pub payment_preimage: Preimage,

    /// Payment secret the payer must present
    pub payment_addr: [u8; 32],

    /// Minimum CLTV delta of the final hop
    pub final_cltv_delta: u32,

    /// Validity period after creation
    pub expiry: Duration,

    pub memo: String,
}

/// Payment request and its state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique key, the SHA-256 of the preimage
    pub payment_hash: Hash,

    pub creation_data: InvoiceCreationData,

    pub settled: bool,

    pub creation_date: DateTime<Utc>,

    pub settle_date: Option<DateTime<Utc>>,

    /// Encoded payment request, absent for spontaneous payments
    pub payment_request: Option<String>,

    pub state: InvoiceState,

    /// HTLCs accepted or settled for this invoice
    pub htlcs: BTreeSet<CircuitKey>,
}

impl Invoice {
    pub fn new(creation_data: InvoiceCreationData, payment_request: Option<String>) -> Self {
        Self {
            payment_hash: creation_data.payment_preimage.hash(),
            creation_data,
            settled: false,
            creation_date: Utc::now(),
            settle_date: None,
            payment_request,
            state: InvoiceState::Open,
            htlcs: BTreeSet::new(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        chrono::Duration::from_std(self.creation_data.expiry)
            .map(|expiry| now >= self.creation_date + expiry)
            .unwrap_or(false)
    }

    /// Moving back to open is never allowed
    pub fn reopen(&mut self) -> Result<(), InvoiceError> {
        match self.state {
            InvoiceState::Canceled => Err(InvoiceError::AlreadyCanceled),
            _ => Err(InvoiceError::CannotOpen),
        }
    }

    pub fn accept(&mut self, htlcs: &[CircuitKey]) -> Result<(), InvoiceError> {
        if htlcs.is_empty() {
            return Err(InvoiceError::EmptyHtlcSet);
        }
        if self.state != InvoiceState::Open {
            return Err(InvoiceError::CannotAccept);
        }

        self.htlcs.extend(htlcs.iter().copied());
        self.state = InvoiceState::Accepted;

        Ok(())
    }

    /// Settle from open or accepted
    pub fn settle(
        &mut self,
        preimage: &Preimage,
        htlcs: &[CircuitKey],
        now: DateTime<Utc>,
    ) -> Result<(), InvoiceError> {
        if htlcs.is_empty() {
            return Err(InvoiceError::EmptyHtlcSet);
        }
        if !preimage.matches(&self.payment_hash) {
            return Err(InvoiceError::PreimageMismatch);
        }

        match self.state {
            InvoiceState::Canceled => return Err(InvoiceError::AlreadyCanceled),
            InvoiceState::Settled => return Err(InvoiceError::AlreadySettled),
            InvoiceState::Open | InvoiceState::Accepted => {}
        }

        self.htlcs.extend(htlcs.iter().copied());
        self.state = InvoiceState::Settled;
        self.settled = true;
        self.settle_date = Some(now);

        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), InvoiceError> {
        match self.state {
            InvoiceState::Canceled => Err(InvoiceError::AlreadyCanceled),
            InvoiceState::Settled => Err(InvoiceError::AlreadySettled),
            InvoiceState::Open | InvoiceState::Accepted => {
                self.state = InvoiceState::Canceled;
                Ok(())
            }
        }
    }
}
