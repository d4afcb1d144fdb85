//! # Custom Validation Runtime
//!
//! Runs one field's custom expression against a submitted record. Each call
//! builds its own bindings, so no state is shared between fields or records.

use serde::{Deserialize, Serialize};

use super::errors::{SandboxError, SandboxResult};
use super::interpreter::{Bindings, Interpreter};
use super::parser::parse;
use super::template::substitute;
use super::value::ScriptValue;
use crate::form::FieldDefinition;
use crate::store::RecordData;

fn default_timeout_ms() -> u64 {
    250
}

fn default_max_steps() -> u64 {
    10_000
}

fn default_max_source_len() -> usize {
    4096
}

/// Sandbox limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Wall-clock budget per evaluation in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum evaluated nodes per evaluation
    #[serde(default = "default_max_steps")]
    pub max_steps: u64,

    /// Maximum expression length in bytes, after substitution
    #[serde(default = "default_max_source_len")]
    pub max_source_len: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_steps: default_max_steps(),
            max_source_len: default_max_source_len(),
        }
    }
}

/// Outcome of a custom expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    /// The final `valid` value, or the raised error, as text
    Invalid(String),
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }
}

/// Evaluator for `validate.custom` expressions
#[derive(Debug, Clone, Default)]
pub struct Sandbox {
    config: SandboxConfig,
}

impl Sandbox {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Evaluates `source` for the field `key`.
    ///
    /// `input` is bound to `data[key]`, `component` to the serialized field
    /// definition and `valid` starts as `true`. The field passes only if
    /// `valid` is exactly `true` afterwards. Any error raised along the way
    /// becomes the failure reason.
    pub fn evaluate(
        &self,
        source: &str,
        key: &str,
        data: &RecordData,
        field: &FieldDefinition,
    ) -> Verdict {
        match self.run(source, key, data, field) {
            Ok(ScriptValue::Bool(true)) => Verdict::Valid,
            Ok(other) => Verdict::Invalid(other.to_display_string()),
            Err(err) => Verdict::Invalid(err.to_string()),
        }
    }

    fn run(
        &self,
        source: &str,
        key: &str,
        data: &RecordData,
        field: &FieldDefinition,
    ) -> SandboxResult<ScriptValue> {
        let source = substitute(source, data)?;
        if source.len() > self.config.max_source_len {
            return Err(SandboxError::SourceTooLong(self.config.max_source_len));
        }
        let program = parse(&source)?;

        let input = data
            .get(key)
            .map_or(ScriptValue::Undefined, ScriptValue::from_json);
        let component = serde_json::to_value(field)
            .map(|v| ScriptValue::from_json(&v))
            .unwrap_or(ScriptValue::Null);

        let interpreter = Interpreter::new(
            Bindings::new(input, component),
            self.config.timeout_ms,
            self.config.max_steps,
        );
        Ok(interpreter.run(&program)?.valid)
    }
}
