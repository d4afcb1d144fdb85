//! Form loader for reading form definitions from disk
//!
//! - One JSON file per form at `<dir>/<form_id>.json`; the file stem must
//!   equal the form's `_id`
//! - Malformed files abort loading with the offending path
//! - A (form id, version) pair is immutable once registered

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::errors::{FormError, FormResult};
use super::types::Form;
use crate::observability::{Event, Logger};
use crate::store::{Cursor, FormSource, Query, StoreError, StoreResult};

/// File-backed registry of form definitions.
#[derive(Debug)]
pub struct FormLoader {
    /// Directory containing form files
    form_dir: PathBuf,
    /// Latest definition per form id
    forms: HashMap<String, Form>,
}

impl FormLoader {
    /// Creates a loader reading from the given directory.
    pub fn new(form_dir: &Path) -> Self {
        Self {
            form_dir: form_dir.to_path_buf(),
            forms: HashMap::new(),
        }
    }

    pub fn form_dir(&self) -> &Path {
        &self.form_dir
    }

    /// Loads every `*.json` file in the form directory.
    ///
    /// A missing directory is treated as empty.
    pub fn load_all(&mut self) -> FormResult<usize> {
        if !self.form_dir.exists() {
            return Ok(0);
        }

        let dir_name = self.form_dir.display().to_string();
        let entries = fs::read_dir(&self.form_dir).map_err(|e| {
            FormError::malformed_file(&dir_name, format!("Failed to read form directory: {}", e))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                FormError::malformed_file(&dir_name, format!("Failed to read directory entry: {}", e))
            })?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in &paths {
            self.load_form_file(path)?;
        }

        let count = paths.len().to_string();
        Logger::info(
            Event::FormsLoaded.as_str(),
            &[("count", count.as_str()), ("dir", dir_name.as_str())],
        );
        Ok(paths.len())
    }

    fn load_form_file(&mut self, path: &Path) -> FormResult<()> {
        let content = fs::read_to_string(path).map_err(|e| {
            FormError::malformed_file(path.display().to_string(), format!("Failed to read file: {}", e))
        })?;

        let form: Form = serde_json::from_str(&content).map_err(|e| {
            FormError::malformed_file(path.display().to_string(), format!("Invalid JSON: {}", e))
        })?;

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        if stem != form.id {
            return Err(FormError::malformed_file(
                path.display().to_string(),
                format!("file name does not match form id '{}'", form.id),
            ));
        }

        self.register(form)
    }

    /// Registers a form definition.
    ///
    /// A newer version replaces the stored one; re-registering an existing
    /// version is rejected.
    pub fn register(&mut self, form: Form) -> FormResult<()> {
        if let Some(existing) = self.forms.get(&form.id) {
            if existing.version >= form.version {
                return Err(FormError::VersionConflict {
                    id: form.id.clone(),
                    version: form.version,
                });
            }
        }
        self.forms.insert(form.id.clone(), form);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Form> {
        self.forms.get(id)
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

impl FormSource for FormLoader {
    async fn get_form(&self, id: &str) -> StoreResult<Option<Form>> {
        Ok(self.forms.get(id).cloned())
    }

    async fn find_forms(&self, query: &Query) -> StoreResult<Cursor<Form>> {
        let mut ids: Vec<&String> = self.forms.keys().collect();
        ids.sort();

        let mut matched = Vec::new();
        for id in ids {
            let form = &self.forms[id];
            let document =
                serde_json::to_value(form).map_err(|e| StoreError::Corrupt(e.to_string()))?;
            if query.matches(&document) {
                matched.push(form.clone());
            }
        }
        Ok(Cursor::snapshot(matched))
    }
}
