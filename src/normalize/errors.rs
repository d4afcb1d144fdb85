//! # Normalizer Errors

use thiserror::Error;

use crate::store::StoreError;

/// Result type for normalizer runs
pub type NormalizeResult<T> = Result<T, NormalizeError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    /// A form lookup, record scan or record update failed.
    ///
    /// The store's error is carried unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The abort handle was raised before the run finished.
    ///
    /// Every update issued before the abort was applied in full.
    #[error("Normalizer aborted after {forms_fixed} fixed form(s)")]
    Aborted { forms_fixed: usize },
}

impl NormalizeError {
    /// The underlying store failure, if this is one.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            NormalizeError::Store(err) => Some(err),
            NormalizeError::Aborted { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_is_transparent() {
        let err = NormalizeError::from(StoreError::Unavailable("down".into()));
        assert_eq!(err.to_string(), "Store unavailable: down");
        assert!(err.store_error().is_some());
    }

    #[test]
    fn test_aborted_message() {
        let err = NormalizeError::Aborted { forms_fixed: 2 };
        assert_eq!(err.to_string(), "Normalizer aborted after 2 fixed form(s)");
        assert!(err.store_error().is_none());
    }
}
