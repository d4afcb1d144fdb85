//! Form definition subsystem
//!
//! A form definition is a recursively nested tree of components. Grouping
//! nodes (columns, rows, generic component groups) contain children; every
//! other node is a leaf field.
//!
//! # Contents
//!
//! - `types`: the component tree and field attributes
//! - `walker`: depth-first leaf traversal and flattening
//! - `loader`: file-backed form source

mod errors;
mod loader;
mod types;
mod walker;

pub use errors::{FormError, FormResult};
pub use loader::FormLoader;
pub use types::{
    Cell, Component, FieldDefinition, FieldKind, Form, ValidateRules, PATH_SEPARATOR,
};
pub use walker::{each_component, each_component_with_path, flatten_components, submission_key};
