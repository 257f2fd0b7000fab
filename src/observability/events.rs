//! Lifecycle events of the ledger process
//!
//! Events are explicit and typed.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Boot & Lifecycle
    BootStart,
    BootComplete,
    /// Ready to read requests from the ordering stream
    Serving,
    ShutdownComplete,

    // Configuration
    ConfigLoaded,
    PolicyLoaded,

    // Store recovery
    RecoveryStart,
    RecoveryComplete,
    /// Frame log failed validation at open (FATAL)
    RecoveryFailed,

    // Operations
    /// Submitted operation committed its unit of work
    OperationCommitted,
    /// Evaluated operation returned without committing
    OperationEvaluated,
    /// Refused by the access gate
    OperationRejected,
    /// Failed for any other reason; nothing was written
    OperationFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BootStart => "LEDGER_STARTUP_BEGIN",
            Event::BootComplete => "LEDGER_STARTUP_COMPLETE",
            Event::Serving => "LEDGER_SERVING",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",

            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::PolicyLoaded => "POLICY_LOADED",

            Event::RecoveryStart => "RECOVERY_BEGIN",
            Event::RecoveryComplete => "RECOVERY_COMPLETE",
            Event::RecoveryFailed => "RECOVERY_FAILED",

            Event::OperationCommitted => "OPERATION_COMMITTED",
            Event::OperationEvaluated => "OPERATION_EVALUATED",
            Event::OperationRejected => "OPERATION_REJECTED",
            Event::OperationFailed => "OPERATION_FAILED",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::RecoveryFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
