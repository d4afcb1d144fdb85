//! Compiled validator cache keyed by (form id, form version)

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use super::compiler::CompiledValidator;
use crate::form::{Form, FormResult};

fn default_enabled() -> bool {
    true
}

/// Cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// When false every lookup compiles afresh
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
        }
    }
}

/// Shares compiled validators between validations of the same form version.
///
/// Entries are immutable; a new form version compiles a new entry.
#[derive(Debug, Default)]
pub struct ValidatorCache {
    config: CacheConfig,
    entries: RwLock<HashMap<(String, u64), Arc<CompiledValidator>>>,
}

impl ValidatorCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached validator for this form version, compiling it on
    /// first use.
    pub fn get_or_compile(&self, form: &Form) -> FormResult<Arc<CompiledValidator>> {
        if !self.config.enabled {
            return CompiledValidator::compile(form).map(Arc::new);
        }

        let key = (form.id.clone(), form.version);
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            if let Some(validator) = entries.get(&key) {
                return Ok(Arc::clone(validator));
            }
        }

        let compiled = Arc::new(CompiledValidator::compile(form)?);
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        // A concurrent caller may have compiled the same version first.
        let validator = entries.entry(key).or_insert(compiled);
        Ok(Arc::clone(validator))
    }

    /// Evicts every version of `form_id`. Returns the number removed.
    pub fn invalidate(&self, form_id: &str) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|(id, _), _| id != form_id);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
