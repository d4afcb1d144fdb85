//! Validation error types
//!
//! Error codes:
//! - FORM_CUSTOM_VALIDATION_FAILED (REJECT)
//! - FORM_UNIQUE_REQUIRED (REJECT)
//! - FORM_UNIQUE_CONFLICT (REJECT)
//! - FORM_STRUCTURAL_VALIDATION_FAILED (REJECT)
//! - FORM_STORE_FAILED (ERROR)
//! - FORM_DEFINITION_INVALID (ERROR)

use std::fmt;

use crate::form::FormError;
use crate::schema::ErrorDetail;
use crate::store::StoreError;

/// Severity levels for validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Submission rejected; the caller must change the record
    Reject,
    /// A collaborator failed; the record itself may be fine
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorCode {
    /// A custom script returned something other than `true`, or raised
    FormCustomValidationFailed,
    /// A directly owned unique field had no value
    FormUniqueRequired,
    /// Another live record already holds the unique value
    FormUniqueConflict,
    /// Type, length, pattern or required violations
    FormStructuralValidationFailed,
    /// The record store failed
    FormStoreFailed,
    /// The form definition could not be compiled
    FormDefinitionInvalid,
}

impl ValidationErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationErrorCode::FormCustomValidationFailed => "FORM_CUSTOM_VALIDATION_FAILED",
            ValidationErrorCode::FormUniqueRequired => "FORM_UNIQUE_REQUIRED",
            ValidationErrorCode::FormUniqueConflict => "FORM_UNIQUE_CONFLICT",
            ValidationErrorCode::FormStructuralValidationFailed => {
                "FORM_STRUCTURAL_VALIDATION_FAILED"
            }
            ValidationErrorCode::FormStoreFailed => "FORM_STORE_FAILED",
            ValidationErrorCode::FormDefinitionInvalid => "FORM_DEFINITION_INVALID",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ValidationErrorCode::FormStoreFailed
            | ValidationErrorCode::FormDefinitionInvalid => Severity::Error,
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for ValidationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Validation error with full context
#[derive(Debug, Clone)]
pub struct ValidationError {
    code: ValidationErrorCode,
    message: String,
    details: Vec<ErrorDetail>,
    store: Option<StoreError>,
}

impl ValidationError {
    /// A custom script rejected `detail.path`.
    pub fn custom_failed(detail: ErrorDetail) -> Self {
        Self {
            code: ValidationErrorCode::FormCustomValidationFailed,
            message: detail.message.clone(),
            details: vec![detail],
            store: None,
        }
    }

    pub fn unique_required(key: &str) -> Self {
        Self {
            code: ValidationErrorCode::FormUniqueRequired,
            message: "Unique fields cannot be empty.".into(),
            details: vec![ErrorDetail::new(
                "Unique fields cannot be empty.",
                key,
                "any.unique",
            )],
            store: None,
        }
    }

    pub fn unique_conflict(key: &str, label: &str) -> Self {
        let message = format!("{} must be unique.", label);
        Self {
            code: ValidationErrorCode::FormUniqueConflict,
            details: vec![ErrorDetail::new(message.clone(), key, "any.unique")],
            message,
            store: None,
        }
    }

    pub fn structural(details: Vec<ErrorDetail>) -> Self {
        let message = details
            .iter()
            .map(|d| d.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            code: ValidationErrorCode::FormStructuralValidationFailed,
            message,
            details,
            store: None,
        }
    }

    pub fn store(err: StoreError) -> Self {
        Self {
            code: ValidationErrorCode::FormStoreFailed,
            message: err.to_string(),
            details: Vec::new(),
            store: Some(err),
        }
    }

    pub fn definition_invalid(err: FormError) -> Self {
        Self {
            code: ValidationErrorCode::FormDefinitionInvalid,
            message: err.to_string(),
            details: Vec::new(),
            store: None,
        }
    }

    pub fn code(&self) -> ValidationErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// `{message, path, type}` entries for the caller
    pub fn details(&self) -> &[ErrorDetail] {
        &self.details
    }

    /// The untouched store failure, for `FORM_STORE_FAILED`
    pub fn store_error(&self) -> Option<&StoreError> {
        self.store.as_ref()
    }

    pub fn is_reject(&self) -> bool {
        self.severity() == Severity::Reject
    }

    /// Replaces the message, keeping code and details.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Appends a detail entry.
    pub fn with_detail(mut self, detail: ErrorDetail) -> Self {
        self.details.push(detail);
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.store.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<StoreError> for ValidationError {
    fn from(err: StoreError) -> Self {
        ValidationError::store(err)
    }
}

impl From<FormError> for ValidationError {
    fn from(err: FormError) -> Self {
        ValidationError::definition_invalid(err)
    }
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;
