//! Observable events
//!
//! Every lifecycle point of validation and normalization has a typed event
//! with a stable upper-case name.

use std::fmt;

use super::logger::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration and definitions
    /// Engine configuration loaded
    ConfigLoaded,
    /// Form definitions loaded from disk
    FormsLoaded,
    /// A form definition compiled into a validator
    SchemaCompiled,

    // Validation
    /// Record validation begins
    ValidationBegin,
    /// Record accepted
    ValidationComplete,
    /// Record rejected
    ValidationRejected,
    /// A custom script rejected a field
    CustomValidationFailed,
    /// A unique value is already held by another record
    UniqueConflict,

    // Normalization
    /// Normalizer run begins
    NormalizeBegin,
    /// Normalizer run complete
    NormalizeComplete,
    /// Normalizer run failed
    NormalizeFailed,
    /// Normalizer run stopped by its abort handle
    NormalizeAborted,
    /// Every record of a form processed
    NormalizeFormFixed,
    /// One record rewritten
    NormalizeRecordRewritten,
    /// A record disappeared between snapshot and update
    NormalizeRecordVanished,
    /// A record update failed and the run continues
    NormalizeRecordFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::FormsLoaded => "FORMS_LOADED",
            Event::SchemaCompiled => "SCHEMA_COMPILED",

            Event::ValidationBegin => "VALIDATION_BEGIN",
            Event::ValidationComplete => "VALIDATION_COMPLETE",
            Event::ValidationRejected => "VALIDATION_REJECTED",
            Event::CustomValidationFailed => "CUSTOM_VALIDATION_FAILED",
            Event::UniqueConflict => "UNIQUE_CONFLICT",

            Event::NormalizeBegin => "NORMALIZE_BEGIN",
            Event::NormalizeComplete => "NORMALIZE_COMPLETE",
            Event::NormalizeFailed => "NORMALIZE_FAILED",
            Event::NormalizeAborted => "NORMALIZE_ABORTED",
            Event::NormalizeFormFixed => "NORMALIZE_FORM_FIXED",
            Event::NormalizeRecordRewritten => "NORMALIZE_RECORD_REWRITTEN",
            Event::NormalizeRecordVanished => "NORMALIZE_RECORD_VANISHED",
            Event::NormalizeRecordFailed => "NORMALIZE_RECORD_FAILED",
        }
    }

    /// Severity the event is logged at by default.
    pub fn severity(&self) -> Severity {
        match self {
            Event::ValidationBegin
            | Event::ValidationComplete
            | Event::SchemaCompiled
            | Event::NormalizeRecordRewritten => Severity::Trace,
            Event::ValidationRejected
            | Event::CustomValidationFailed
            | Event::UniqueConflict
            | Event::NormalizeAborted
            | Event::NormalizeRecordVanished => Severity::Warn,
            Event::NormalizeFailed | Event::NormalizeRecordFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Event; 16] = [
        Event::ConfigLoaded,
        Event::FormsLoaded,
        Event::SchemaCompiled,
        Event::ValidationBegin,
        Event::ValidationComplete,
        Event::ValidationRejected,
        Event::CustomValidationFailed,
        Event::UniqueConflict,
        Event::NormalizeBegin,
        Event::NormalizeComplete,
        Event::NormalizeFailed,
        Event::NormalizeAborted,
        Event::NormalizeFormFixed,
        Event::NormalizeRecordRewritten,
        Event::NormalizeRecordVanished,
        Event::NormalizeRecordFailed,
    ];

    #[test]
    fn test_names_are_upper_snake_case() {
        for event in ALL {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_failures_are_not_quiet() {
        assert_eq!(Event::NormalizeFailed.severity(), Severity::Error);
        assert_eq!(Event::UniqueConflict.severity(), Severity::Warn);
        assert_eq!(Event::NormalizeFormFixed.severity(), Severity::Info);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Event::NormalizeBegin), "NORMALIZE_BEGIN");
    }
}
