//! Unique-value normalization
//!
//! Stored values of unique fields may predate case-insensitive uniqueness.
//! The normalizer rewrites them to lowercase so that equality lookups see
//! every conflicting record. Runs are idempotent: a second run over
//! normalized data issues no updates.

mod errors;
mod progress;
mod rewrite;
mod sweep;

pub use errors::{NormalizeError, NormalizeResult};
pub use progress::{AbortHandle, FixedForms, NormalizeReport, RecordFailure};
pub use rewrite::{plan_rewrite, unique_paths};
pub use sweep::{
    nested_unique_query, normalize, top_level_unique_query, Normalizer, NormalizerConfig,
};
