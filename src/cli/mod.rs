//! CLI module for assetledger
//!
//! Provides command-line interface for:
//! - init: Create the data directory
//! - submit: One-shot operation, writes committed
//! - evaluate: One-shot operation, nothing committed
//! - start: Boot and submit a newline-delimited request stream in order

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{evaluate, init, run, run_command, serve, start, submit};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{parse_request, write_error, write_response};
