//! assetledger CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`. Errors go to stderr
//! and map to the exit status of their code. No configuration, recovery or
//! file access happens here.

use assetledger::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(e.exit_status());
    }
}
