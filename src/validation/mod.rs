//! Submission validation subsystem
//!
//! Runs the three validation stages for one record, in order:
//!
//! 1. custom scripts, fail-fast, only for keys present in the record
//! 2. uniqueness against the record store, sequential and fail-fast
//! 3. structural validation, which yields the canonical record
//!
//! A record rejected by an earlier stage never reaches a later one.

mod errors;
mod pipeline;
mod unique;

pub use errors::{Severity, ValidationError, ValidationErrorCode, ValidationResult};
pub use pipeline::{validate, ErrorAugmenter, SubmissionValidator};
pub use unique::{unique_query, UniquenessChecker};
