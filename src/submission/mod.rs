//! Submission envelope helpers
//!
//! - `Submission`: the `{_id, form, data, deleted}` envelope
//! - `filter_protected`: what callers are allowed to see
//! - `find_existing`: lookup by non-protected submitted values

mod envelope;
mod exists;
mod filter;

pub use envelope::Submission;
pub use exists::find_existing;
pub use filter::{filter_protected, HIDDEN_FIELDS};
