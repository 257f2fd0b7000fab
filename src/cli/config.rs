//! Configuration file
//!
//! ```json
//! {"data_dir": "/var/lib/assetledger", "sync_mode": "fsync", "audit_log": true,
//!  "policy": {"rules": [...], "collections": {...}}}
//! ```
//!
//! Only `data_dir` is required. Without `policy` the stock access table
//! applies.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::{CliError, CliResult};
use crate::access::{AccessPolicy, PolicyConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Data directory (required)
    pub data_dir: String,

    /// Sync mode (optional, default "fsync")
    #[serde(default = "default_sync_mode")]
    pub sync_mode: String,

    /// Write the operation audit trail to `<data_dir>/audit.log`
    #[serde(default = "default_audit_log")]
    pub audit_log: bool,

    /// Replaces the stock access policy
    #[serde(default)]
    pub policy: Option<PolicyConfig>,
}

fn default_sync_mode() -> String {
    "fsync".to_string()
}

fn default_audit_log() -> bool {
    true
}

impl Config {
    /// Load and validate configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.data_dir.trim().is_empty() {
            return Err(CliError::config_error("data_dir must not be empty"));
        }

        if self.sync_mode != "fsync" {
            return Err(CliError::config_error(format!(
                "Invalid sync_mode: '{}'. Only 'fsync' is allowed.",
                self.sync_mode
            )));
        }

        self.access_policy().map(|_| ())
    }

    pub fn data_path(&self) -> &Path {
        Path::new(&self.data_dir)
    }

    pub fn audit_path(&self) -> PathBuf {
        self.data_path().join("audit.log")
    }

    /// The configured policy, or the stock one
    pub fn access_policy(&self) -> CliResult<AccessPolicy> {
        match &self.policy {
            Some(policy) => AccessPolicy::from_config(policy)
                .map_err(|e| CliError::config_error(format!("Policy error: {}", e))),
            None => Ok(AccessPolicy::default()),
        }
    }
}
