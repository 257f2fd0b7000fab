//! CLI command implementations
//!
//! Boot sequence for every command that touches the ledger:
//! 1. Configuration load and policy validation
//! 2. Frame log replay (recovery)
//! 3. Audit trail open
//!
//! Any boot failure halts the command. Operation failures do not: they are
//! written as error responses.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use super::args::Command;
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::{parse_request, read_request, request_lines, write_error, write_response};
use crate::ledger::{Ledger, LedgerResult, Response};
use crate::observability::{log_event, log_event_with_fields, Event, FileAuditLog};
use crate::storage::FileMedium;

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init { config } => init(&config),
        Command::Submit { config } => submit(&config),
        Command::Evaluate { config } => evaluate(&config),
        Command::Start { config } => start(&config),
    }
}

fn ledger_dir(data_dir: &Path) -> std::path::PathBuf {
    data_dir.join("ledger")
}

fn is_initialized(data_dir: &Path) -> bool {
    ledger_dir(data_dir).exists()
}

/// Initialize a new ledger data directory
///
/// Creates the directory layout and an empty frame log. Writes no frames.
pub fn init(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let data_dir = config.data_path();

    if is_initialized(data_dir) {
        return Err(CliError::already_initialized());
    }

    FileMedium::open(data_dir)
        .map_err(|e| CliError::config_error(format!("Failed to create ledger directory: {}", e)))?;

    write_response(&mut io::stdout(), json!({"initialized": true}))
}

/// Submit a single operation from stdin and exit
pub fn submit(config_path: &Path) -> CliResult<()> {
    let mut ledger = boot(config_path)?;
    let invocation = read_request()?;
    let result = ledger.submit(&invocation);
    write_result(&mut io::stdout(), result)
}

/// Evaluate a single operation from stdin and exit
pub fn evaluate(config_path: &Path) -> CliResult<()> {
    let ledger = boot(config_path)?;
    let invocation = read_request()?;
    let result = ledger.evaluate(&invocation);
    write_result(&mut io::stdout(), result)
}

/// Boot the ledger, then submit each request line from stdin in order
pub fn start(config_path: &Path) -> CliResult<()> {
    let mut ledger = boot(config_path)?;

    log_event(Event::Serving);
    let stdin = io::stdin();
    let result = serve(&mut ledger, stdin.lock(), &mut io::stdout());
    log_event(Event::ShutdownComplete);
    result
}

/// Submits every request in `input`, one response line per request.
///
/// A malformed line gets an error response and is skipped. An I/O failure
/// on either stream ends the loop.
pub fn serve<R: BufRead, W: Write>(ledger: &mut Ledger, input: R, out: &mut W) -> CliResult<()> {
    for line in request_lines(input) {
        let line = line?;
        match parse_request(&line) {
            Ok(invocation) => {
                let result = ledger.submit(&invocation);
                write_result(out, result)?;
            }
            Err(e) => write_error(out, e.code_str(), e.message())?,
        }
    }
    Ok(())
}

fn write_result<W: Write>(out: &mut W, result: LedgerResult<Response>) -> CliResult<()> {
    match result {
        Ok(response) => write_response(out, serde_json::to_value(&response)?),
        Err(e) => write_error(out, e.code(), e.message()),
    }
}

/// Full boot. Fails unless the data directory was initialized.
fn boot(config_path: &Path) -> CliResult<Ledger> {
    log_event(Event::BootStart);

    let config = Config::load(config_path)?;
    let data_dir = config.data_path();
    log_event_with_fields(Event::ConfigLoaded, &[("data_dir", &config.data_dir)]);

    if !is_initialized(data_dir) {
        return Err(CliError::not_initialized());
    }

    let policy = config.access_policy()?;
    let source = if config.policy.is_some() { "config" } else { "default" };
    log_event_with_fields(Event::PolicyLoaded, &[("source", source)]);

    let medium = FileMedium::open(data_dir)
        .map_err(|e| CliError::boot_failed(format!("Ledger medium open failed: {}", e)))?;
    let mut ledger = Ledger::open(Box::new(medium), Arc::new(policy))
        .map_err(|e| CliError::boot_failed(format!("Recovery failed (FATAL): {}", e)))?;

    if config.audit_log {
        let audit = FileAuditLog::open(config.audit_path())
            .map_err(|e| CliError::boot_failed(format!("Audit log open failed: {}", e)))?;
        ledger = ledger.with_audit(Arc::new(audit));
    }

    log_event(Event::BootComplete);
    Ok(ledger)
}
