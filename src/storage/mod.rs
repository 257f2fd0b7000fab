//! Versioned state storage for the ledger
//!
//! All state lives in one append-only frame log. Each committed operation
//! becomes exactly one checksummed frame holding every write it made, so a
//! frame is the unit of atomicity and the log doubles as key history.
//!
//! # Design Principles
//!
//! - Append-only (no in-place updates)
//! - Checksum-verified on every read
//! - Tombstones kept forever; history never shrinks
//! - Latest frame wins for the same key
//! - Halt on corruption: a bad frame at open refuses to start

mod checksum;
mod errors;
mod history;
mod medium;
mod partition;
mod reader;
mod record;
mod store;
mod unit_of_work;

pub use checksum::{compute_checksum, verify_checksum};
pub use errors::{Severity, StoreError, StoreErrorCode, StoreResult};
pub use history::{HistoryEntry, HistoryIter};
pub use medium::{FileMedium, Medium, MemoryMedium, ReadSeek};
pub use partition::{is_valid_name, Partition};
pub use reader::FrameReader;
pub use record::{CommitFrame, WriteEntry};
pub use store::{CommitReceipt, RangeIter, StateStore, Versioned};
pub use unit_of_work::{PendingWrite, UnitOfWork};
