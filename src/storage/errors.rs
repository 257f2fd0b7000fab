//! Storage error types
//!
//! Error codes:
//! - LEDGER_STORE_UNAVAILABLE (ERROR) - the durable medium cannot be reached
//! - LEDGER_STORE_WRITE_FAILED (ERROR) - a commit frame could not be persisted
//! - LEDGER_STORE_READ_FAILED (ERROR) - a frame could not be read back
//! - LEDGER_DATA_CORRUPTION (FATAL) - checksum or framing failure
//! - LEDGER_VERSION_CONFLICT (ERROR) - a unit of work read stale versions

use std::fmt;
use std::io;

/// Severity levels for storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, ledger continues
    Error,
    /// Ledger must stop serving
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Storage-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// Medium unreachable
    StoreUnavailable,
    /// Frame write or fsync failed
    WriteFailed,
    /// Frame read failed
    ReadFailed,
    /// Checksum or framing failure
    DataCorruption,
    /// Read set no longer matches committed versions
    VersionConflict,
}

impl StoreErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            StoreErrorCode::StoreUnavailable => "LEDGER_STORE_UNAVAILABLE",
            StoreErrorCode::WriteFailed => "LEDGER_STORE_WRITE_FAILED",
            StoreErrorCode::ReadFailed => "LEDGER_STORE_READ_FAILED",
            StoreErrorCode::DataCorruption => "LEDGER_DATA_CORRUPTION",
            StoreErrorCode::VersionConflict => "LEDGER_VERSION_CONFLICT",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            StoreErrorCode::DataCorruption => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Storage error with code, message and optional context
#[derive(Debug)]
pub struct StoreError {
    code: StoreErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl StoreError {
    fn with_code(code: StoreErrorCode, message: impl Into<String>, source: Option<io::Error>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source,
        }
    }

    /// The medium cannot be reached
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::with_code(StoreErrorCode::StoreUnavailable, message, None)
    }

    /// The medium cannot be reached, with the underlying I/O error
    pub fn unavailable_io(message: impl Into<String>, source: io::Error) -> Self {
        Self::with_code(StoreErrorCode::StoreUnavailable, message, Some(source))
    }

    /// A frame write or fsync failed
    pub fn write_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self::with_code(StoreErrorCode::WriteFailed, message, Some(source))
    }

    /// A frame could not be read back
    pub fn read_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self::with_code(StoreErrorCode::ReadFailed, message, Some(source))
    }

    /// Corruption without positional context
    pub fn data_corruption(message: impl Into<String>) -> Self {
        Self::with_code(StoreErrorCode::DataCorruption, message, None)
    }

    /// Corruption at a byte offset in the frame log
    pub fn corruption_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        let mut err = Self::data_corruption(reason);
        err.details = Some(format!("byte_offset: {}", offset));
        err
    }

    /// A unit of work observed a version that has since changed
    pub fn version_conflict(partition: &str, key: &str, observed: Option<u64>, current: Option<u64>) -> Self {
        let mut err = Self::with_code(
            StoreErrorCode::VersionConflict,
            format!("stale read of {} in {}", key, partition),
            None,
        );
        err.details = Some(format!("observed: {:?}, current: {:?}", observed, current));
        err
    }

    /// Returns the error code
    pub fn code(&self) -> StoreErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns whether the ledger must stop serving
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;
