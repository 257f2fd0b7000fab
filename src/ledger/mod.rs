//! Asset ledger engine
//!
//! An operation flows: access gate -> reads and buffered writes through a
//! [`TxContext`] -> atomic commit of the unit of work. Any failure aborts the
//! operation with no state change.

mod context;
mod engine;
mod errors;
mod invocation;
mod txid;

pub use context::{decode, TxContext};
pub use engine::{Ledger, Response};
pub use errors::{LedgerError, LedgerErrorKind, LedgerResult};
pub use invocation::Invocation;
pub use txid::{derive_tx_id, tx_id_from_nonce};
