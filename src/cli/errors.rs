//! CLI-specific error types
//!
//! A CLI error stops the process with a non-zero status. Operation failures
//! are not CLI errors: they become error responses and the command carries on.

use std::fmt;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    ConfigError,
    /// stdin/stdout failure
    IoError,
    /// Request line is not a valid operation
    BadRequest,
    AlreadyInitialized,
    NotInitialized,
    /// Medium, recovery or audit trail could not be opened
    BootFailed,
}

impl CliErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            CliErrorCode::ConfigError => "LEDGER_CLI_CONFIG_ERROR",
            CliErrorCode::IoError => "LEDGER_CLI_IO_ERROR",
            CliErrorCode::BadRequest => "LEDGER_CLI_BAD_REQUEST",
            CliErrorCode::AlreadyInitialized => "LEDGER_CLI_ALREADY_INITIALIZED",
            CliErrorCode::NotInitialized => "LEDGER_CLI_NOT_INITIALIZED",
            CliErrorCode::BootFailed => "LEDGER_CLI_BOOT_FAILED",
        }
    }

    /// Process exit status: 2 for operator mistakes, 1 for runtime failures
    pub fn exit_status(&self) -> i32 {
        match self {
            CliErrorCode::ConfigError
            | CliErrorCode::BadRequest
            | CliErrorCode::AlreadyInitialized
            | CliErrorCode::NotInitialized => 2,
            CliErrorCode::IoError | CliErrorCode::BootFailed => 1,
        }
    }
}

impl fmt::Display for CliErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A fatal CLI failure with its code
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::BadRequest, msg)
    }

    pub fn boot_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::BootFailed, msg)
    }

    pub fn already_initialized() -> Self {
        Self::new(CliErrorCode::AlreadyInitialized, "data directory is already initialized")
    }

    pub fn not_initialized() -> Self {
        Self::new(
            CliErrorCode::NotInitialized,
            "data directory is not initialized; run 'assetledger init' first",
        )
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn exit_status(&self) -> i32 {
        self.code.exit_status()
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

/// Stream failures are I/O errors; anything else is a bad request.
impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Self::io_error(e.to_string())
        } else {
            Self::bad_request(format!("invalid request: {}", e))
        }
    }
}
