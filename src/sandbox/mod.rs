//! # Custom Validation Sandbox
//!
//! A restricted expression language for `validate.custom` scripts. Scripts
//! see exactly three bindings (`input`, `component`, `valid`) and run under
//! a wall-clock deadline and a step budget.

mod errors;
mod interpreter;
mod lexer;
mod parser;
mod runtime;
mod template;
mod value;

pub use errors::{SandboxError, SandboxResult};
pub use runtime::{Sandbox, SandboxConfig, Verdict};
pub use value::ScriptValue;
