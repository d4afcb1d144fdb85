//! Form definition errors

use thiserror::Error;

/// Result type for form definition operations
pub type FormResult<T> = Result<T, FormError>;

/// Errors raised while reading or compiling form definitions
#[derive(Debug, Error)]
pub enum FormError {
    #[error("malformed component: {0}")]
    MalformedComponent(String),

    #[error("malformed form file '{path}': {reason}")]
    MalformedFile { path: String, reason: String },

    #[error("invalid pattern for field '{key}': {reason}")]
    InvalidPattern { key: String, reason: String },

    #[error("form '{0}' not found")]
    NotFound(String),

    #[error("form '{id}' version {version} is already registered")]
    VersionConflict { id: String, version: u64 },
}

impl FormError {
    pub fn malformed_file(path: impl Into<String>, reason: impl Into<String>) -> Self {
        FormError::MalformedFile {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_subject() {
        let err = FormError::malformed_file("forms/a.json", "Invalid JSON");
        assert_eq!(err.to_string(), "malformed form file 'forms/a.json': Invalid JSON");

        let err = FormError::InvalidPattern {
            key: "zip".into(),
            reason: "unclosed group".into(),
        };
        assert!(err.to_string().contains("zip"));
    }
}
