//! # Sandbox Errors
//!
//! The `Display` form of every variant is what a rejected field reports as
//! its failure reason, so messages follow the familiar `Kind: detail` shape
//! of script engines.

use thiserror::Error;

/// Result type for sandbox operations
pub type SandboxResult<T> = Result<T, SandboxError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SandboxError {
    #[error("SyntaxError: {0}")]
    Syntax(String),

    #[error("ReferenceError: {0} is not defined")]
    UndefinedBinding(String),

    #[error("TypeError: {0}")]
    Type(String),

    #[error("TimeoutError: script execution timed out after {0}ms")]
    Timeout(u64),

    #[error("RangeError: script exceeded {0} evaluation steps")]
    StepLimit(u64),

    #[error("RangeError: script source exceeds {0} bytes")]
    SourceTooLong(usize),

    #[error("TemplateError: {0}")]
    UnsupportedTemplate(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_strings() {
        assert_eq!(
            SandboxError::UndefinedBinding("foo".into()).to_string(),
            "ReferenceError: foo is not defined"
        );
        assert_eq!(
            SandboxError::Timeout(250).to_string(),
            "TimeoutError: script execution timed out after 250ms"
        );
    }
}
