//! Schema compiler subsystem
//!
//! Turns a form definition into a [`CompiledValidator`]: one type rule per
//! keyed leaf, plus the ordered sets of custom-validated and unique fields.
//!
//! # Design Principles
//!
//! - Compiled once per form version, immutable afterwards
//! - Patterns compiled at compile time, never per record
//! - Structural validation coerces and strips; it reports every violation
//! - Output holds declared keys and `_id` only

mod cache;
mod compiler;
mod errors;
mod rules;
mod structural;

pub use cache::{CacheConfig, ValidatorCache};
pub use compiler::{CompiledValidator, CustomCheck};
pub use errors::{ErrorDetail, StructuralResult};
pub use rules::{FieldRule, NumberBounds, Precision, TypeRule};
pub use structural::{canonical_value, check_field, ID_KEY};
