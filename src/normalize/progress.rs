//! Per-run progress tracking
//!
//! Nothing here outlives a single normalizer invocation. Each run starts
//! from an empty fixed set and relies on idempotent rewrites instead of a
//! persisted checkpoint.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::store::StoreError;

/// Shared stop flag for a running sweep.
///
/// Cloning yields a handle to the same flag. The sweep checks it before
/// each record; an update already handed to the store still completes.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Form identifiers already processed in this run, in processing order.
#[derive(Debug, Clone, Default)]
pub struct FixedForms {
    seen: HashSet<String>,
    order: Vec<String>,
}

impl FixedForms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `form_id` as fixed. Returns false if it already was.
    pub fn mark(&mut self, form_id: &str) -> bool {
        if !self.seen.insert(form_id.to_string()) {
            return false;
        }
        self.order.push(form_id.to_string());
        true
    }

    pub fn contains(&self, form_id: &str) -> bool {
        self.seen.contains(form_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// The fixed identifiers as JSON strings, for `$nin`-style exclusion.
    pub fn to_values(&self) -> Vec<Value> {
        self.order.iter().cloned().map(Value::String).collect()
    }
}

/// A record update that failed while the run continued.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFailure {
    pub form_id: String,
    pub record_id: String,
    pub error: StoreError,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeReport {
    /// Fixed forms in processing order
    pub forms_fixed: Vec<String>,
    pub records_scanned: usize,
    pub records_rewritten: usize,
    /// Records deleted between snapshot and update
    pub records_vanished: usize,
    /// Only populated when the run continues past update failures
    pub failures: Vec<RecordFailure>,
}

impl NormalizeReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
