//! CLI argument definitions using clap
//!
//! Commands:
//! - assetledger init --config <path>
//! - assetledger submit --config <path>
//! - assetledger evaluate --config <path>
//! - assetledger start --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Shared, auditable asset ledger
#[derive(Parser, Debug)]
#[command(name = "assetledger")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a new ledger data directory
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./assetledger.json")]
        config: PathBuf,
    },

    /// Submit one operation read from stdin and commit its writes
    Submit {
        /// Path to configuration file
        #[arg(long, default_value = "./assetledger.json")]
        config: PathBuf,
    },

    /// Evaluate one operation read from stdin without committing
    Evaluate {
        /// Path to configuration file
        #[arg(long, default_value = "./assetledger.json")]
        config: PathBuf,
    },

    /// Boot the ledger and submit each stdin line in order
    Start {
        /// Path to configuration file
        #[arg(long, default_value = "./assetledger.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
