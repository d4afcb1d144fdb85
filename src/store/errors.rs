//! # Store Errors

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by a record store or form source.
///
/// Callers pass these through unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Update failed for record '{id}': {reason}")]
    UpdateFailed { id: String, reason: String },

    #[error("Corrupt document: {0}")]
    Corrupt(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn update_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::UpdateFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_failure_names_record() {
        let err = StoreError::update_failed("r1", "write conflict");
        assert_eq!(err.to_string(), "Update failed for record 'r1': write conflict");
    }
}
