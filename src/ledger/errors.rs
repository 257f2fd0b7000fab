//! Ledger error taxonomy
//!
//! Error codes:
//! - LEDGER_NOT_FOUND - key absent when existence is required
//! - LEDGER_ALREADY_EXISTS - create on an existing key
//! - LEDGER_UNAUTHORIZED - credential fails the policy or collection check
//! - LEDGER_NO_MATCH - matching predicate fails
//! - LEDGER_MALFORMED_DATA - stored value does not decode to the expected shape
//! - LEDGER_STORE_UNAVAILABLE - durable medium unreachable (retryable)
//! - LEDGER_INVALID_ARGUMENT - unknown contract/function, bad arguments or selector
//! - LEDGER_CONFLICT - stale read set at commit (retryable)
//!
//! Every failure aborts the operation with no state change.

use std::fmt;

use thiserror::Error;

use crate::access::AccessError;
use crate::query::QueryError;
use crate::storage::{StoreError, StoreErrorCode};

/// Failure kinds surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerErrorKind {
    NotFound,
    AlreadyExists,
    Unauthorized,
    NoMatch,
    MalformedData,
    StoreUnavailable,
    InvalidArgument,
    Conflict,
}

impl LedgerErrorKind {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            LedgerErrorKind::NotFound => "LEDGER_NOT_FOUND",
            LedgerErrorKind::AlreadyExists => "LEDGER_ALREADY_EXISTS",
            LedgerErrorKind::Unauthorized => "LEDGER_UNAUTHORIZED",
            LedgerErrorKind::NoMatch => "LEDGER_NO_MATCH",
            LedgerErrorKind::MalformedData => "LEDGER_MALFORMED_DATA",
            LedgerErrorKind::StoreUnavailable => "LEDGER_STORE_UNAVAILABLE",
            LedgerErrorKind::InvalidArgument => "LEDGER_INVALID_ARGUMENT",
            LedgerErrorKind::Conflict => "LEDGER_CONFLICT",
        }
    }

    /// Whether an external caller may retry the same operation unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerErrorKind::StoreUnavailable | LedgerErrorKind::Conflict)
    }
}

impl fmt::Display for LedgerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Structured operation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct LedgerError {
    kind: LedgerErrorKind,
    message: String,
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    pub fn new(kind: LedgerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(what: &str, key: &str) -> Self {
        Self::new(LedgerErrorKind::NotFound, format!("the {} {} does not exist", what, key))
    }

    pub fn already_exists(what: &str, key: &str) -> Self {
        Self::new(LedgerErrorKind::AlreadyExists, format!("the {} {} already exists", what, key))
    }

    pub fn no_match(message: impl Into<String>) -> Self {
        Self::new(LedgerErrorKind::NoMatch, message)
    }

    pub fn malformed(what: &str, key: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            LedgerErrorKind::MalformedData,
            format!("stored {} {} is malformed: {}", what, key, reason),
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(LedgerErrorKind::InvalidArgument, message)
    }

    pub fn kind(&self) -> LedgerErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        let kind = match err.code() {
            StoreErrorCode::VersionConflict => LedgerErrorKind::Conflict,
            _ => LedgerErrorKind::StoreUnavailable,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<QueryError> for LedgerError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Store(store) => store.into(),
            other => Self::invalid_argument(other.to_string()),
        }
    }
}

impl From<AccessError> for LedgerError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::InvalidPolicy(_) => Self::invalid_argument(err.to_string()),
            _ => Self::new(LedgerErrorKind::Unauthorized, err.to_string()),
        }
    }
}
