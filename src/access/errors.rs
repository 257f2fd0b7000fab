//! # Access Errors

use thiserror::Error;

/// Result type for access control
pub type AccessResult<T> = Result<T, AccessError>;

/// Access control failures
///
/// Denials carry the caller identity and what was refused, never whether
/// the targeted asset exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// Caller has no organization or client id
    #[error("Caller credential is not resolved")]
    UnresolvedCredential,

    /// Policy table refuses the operation
    #[error("{org}/{client} may not {action} {asset}")]
    Denied {
        org: String,
        client: String,
        asset: String,
        action: String,
    },

    /// Caller's organization is not a member of the collection
    #[error("{org}/{client} is not a member of collection {collection}")]
    CollectionDenied {
        org: String,
        client: String,
        collection: String,
    },

    /// Policy configuration failed validation
    #[error("Invalid access policy: {0}")]
    InvalidPolicy(String),
}
