//! formguard - schema-driven validation for form submissions
//!
//! A form definition (a nested tree of components) compiles into a
//! validator. A submitted record then passes three ordered stages:
//!
//! 1. custom expressions, evaluated in a restricted sandbox
//! 2. cross-record uniqueness checks against a record store
//! 3. structural validation, which coerces and strips the record
//!
//! The normalizer is a separate batch sweep that lowercases stored unique
//! values so that case-insensitive uniqueness holds for older records.

pub mod config;
pub mod form;
pub mod normalize;
pub mod observability;
pub mod sandbox;
pub mod schema;
pub mod store;
pub mod submission;
pub mod validation;

pub use config::{ConfigError, EngineConfig};
pub use form::{Component, FieldDefinition, Form, FormLoader};
pub use normalize::{normalize, NormalizeError, NormalizeReport, Normalizer};
pub use schema::{CompiledValidator, ValidatorCache};
pub use store::{MemoryStore, Query, Record, RecordData, RecordStore};
pub use submission::Submission;
pub use validation::{validate, SubmissionValidator, ValidationError, ValidationErrorCode};
