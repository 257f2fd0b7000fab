//! Observability for the ledger
//!
//! - Structured logging (JSON lines)
//! - Typed lifecycle events
//! - Append-only operation audit trail
//!
//! Observability is read-only: it never changes the outcome of an
//! operation, and a failing sink never fails the caller.
//!
//! ```ignore
//! use assetledger::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::ConfigLoaded, &[("data_dir", "/var/ledger")]);
//! ```

pub mod audit;
mod events;
mod logger;

pub use audit::{AuditAction, AuditLog, AuditOutcome, AuditRecord, FileAuditLog, MemoryAuditLog};
pub use events::Event;
pub use logger::{Logger, Severity};

/// Log a lifecycle event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    if event.is_fatal() {
        Logger::fatal(event.as_str(), fields);
    } else {
        Logger::info(event.as_str(), fields);
    }
}
