//! Form -> CompiledValidator
//!
//! A compiled validator is immutable and may be shared across concurrent
//! validations.

use indexmap::IndexMap;

use super::errors::StructuralResult;
use super::rules::FieldRule;
use super::structural;
use crate::form::{flatten_components, FieldDefinition, Form, FormResult};
use crate::observability::{Event, Logger};
use crate::store::RecordData;

/// A field registered for custom-script evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomCheck {
    pub source: String,
    pub field: FieldDefinition,
}

/// Executable validator for one form version.
#[derive(Debug, Clone)]
pub struct CompiledValidator {
    form_id: String,
    version: u64,
    rules: IndexMap<String, FieldRule>,
    custom: IndexMap<String, CustomCheck>,
    unique: IndexMap<String, FieldDefinition>,
}

impl CompiledValidator {
    /// Compiles every keyed leaf of `form`.
    ///
    /// # Errors
    ///
    /// Returns `FormError::InvalidPattern` if a `validate.pattern` does not
    /// compile.
    pub fn compile(form: &Form) -> FormResult<Self> {
        let leaves = flatten_components(&form.components);

        let mut rules = IndexMap::with_capacity(leaves.len());
        let mut custom = IndexMap::new();
        let mut unique = IndexMap::new();

        for (key, field) in leaves {
            rules.insert(key.clone(), FieldRule::compile(&key, &field)?);

            if field.persistent {
                if let Some(source) = field.validate.as_ref().and_then(|v| v.custom.clone()) {
                    custom.insert(
                        key.clone(),
                        CustomCheck {
                            source,
                            field: field.clone(),
                        },
                    );
                }
            }
            if field.unique {
                unique.insert(key, field);
            }
        }

        let validator = Self {
            form_id: form.id.clone(),
            version: form.version,
            rules,
            custom,
            unique,
        };

        let version = validator.version.to_string();
        let fields = validator.rules.len().to_string();
        let custom = validator.custom.len().to_string();
        let unique = validator.unique.len().to_string();
        Logger::event(
            Event::SchemaCompiled,
            &[
                ("form_id", validator.form_id.as_str()),
                ("version", version.as_str()),
                ("fields", fields.as_str()),
                ("custom", custom.as_str()),
                ("unique", unique.as_str()),
            ],
        );

        Ok(validator)
    }

    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Type rules in registration order
    pub fn rules(&self) -> &IndexMap<String, FieldRule> {
        &self.rules
    }

    pub fn rule(&self, key: &str) -> Option<&FieldRule> {
        self.rules.get(key)
    }

    /// Custom-validated fields in registration order
    pub fn custom_checks(&self) -> &IndexMap<String, CustomCheck> {
        &self.custom
    }

    /// Unique fields in registration order
    pub fn unique_fields(&self) -> &IndexMap<String, FieldDefinition> {
        &self.unique
    }

    /// Runs structural validation and returns the canonical record.
    pub fn apply(&self, data: &RecordData) -> StructuralResult<RecordData> {
        structural::apply(&self.rules, data)
    }
}
