//! # Query Errors

use thiserror::Error;

use crate::storage::StoreError;

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Selector parse and execution errors
#[derive(Debug, Error)]
pub enum QueryError {
    /// Query string is not JSON or has the wrong shape
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Operator outside the supported set
    #[error("Unsupported selector operator: {0}")]
    UnsupportedOperator(String),

    /// Underlying store failure during the scan
    #[error(transparent)]
    Store(#[from] StoreError),
}
