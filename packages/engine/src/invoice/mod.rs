// packages/engine/src/invoice/mod.rs
//! Invoice contract
//!
//! - **State**: the invoice record and its lifecycle guards
//! - **Store**: lookup and state transitions by payment hash
//!
//! ```text
//! Open ──accept──▶ Accepted ──settle──▶ Settled
//!   │  └────────────settle───────────────▲
//!   └──cancel──▶ Canceled ◀──cancel── Accepted
//! ```

pub mod state;
pub mod store;

use thiserror::Error;

pub use state::{Invoice, InvoiceCreationData, InvoiceState};
pub use store::{InvoiceStore, MemoryInvoiceStore};

/// Rejected invoice transitions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvoiceError {
    #[error("invoice already canceled")]
    AlreadyCanceled,

    #[error("invoice already settled")]
    AlreadySettled,

    #[error("cannot move invoice to open")]
    CannotOpen,

    /// Accept outside of the open state
    #[error("cannot accept invoice")]
    CannotAccept,

    #[error("preimage does not match")]
    PreimageMismatch,

    #[error("cannot settle/accept empty HTLC set")]
    EmptyHtlcSet,

    #[error("invoice not found")]
    NotFound,

    /// An invoice with the same payment hash exists
    #[error("duplicate invoice")]
    Duplicate,
}
