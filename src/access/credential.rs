//! Caller credential
//!
//! Resolved once per operation by the submitting collaborator and never
//! persisted.

use serde::{Deserialize, Serialize};

use super::errors::{AccessError, AccessResult};

/// Organizational identity of the caller
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Credential {
    /// Organization (MSP) identifier, matched exactly and case-sensitively
    pub org_id: String,
    /// Unique client identity within the organization
    pub client_id: String,
}

impl Credential {
    pub fn new(org_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            org_id: org_id.into(),
            client_id: client_id.into(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        !self.org_id.is_empty() && !self.client_id.is_empty()
    }

    /// Fails with `UnresolvedCredential` unless both ids are present.
    pub fn require_resolved(&self) -> AccessResult<&Self> {
        if self.is_resolved() {
            Ok(self)
        } else {
            Err(AccessError::UnresolvedCredential)
        }
    }
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.org_id, self.client_id)
    }
}
