//! In-memory document store
//!
//! Reference implementation of [`RecordStore`] and [`FormSource`]. Records
//! are held as JSON documents in insertion order so that queries see exactly
//! what a document database would.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use chrono::Utc;
use indexmap::IndexMap;
use serde_json::Value;
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};
use super::query::Query;
use super::record::{Cursor, PartialUpdate, Record};
use super::source::{FormSource, RecordStore};
use crate::form::Form;

/// Thread-safe in-memory store for forms and records.
#[derive(Debug, Default)]
pub struct MemoryStore {
    forms: RwLock<IndexMap<String, Form>>,
    records: RwLock<IndexMap<String, Value>>,
    fail_queries: AtomicBool,
    fail_updates: AtomicBool,
    updates_applied: AtomicUsize,
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Internal("Lock poisoned".into())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a form definition.
    pub fn insert_form(&self, form: Form) -> StoreResult<()> {
        let mut forms = self.forms.write().map_err(poisoned)?;
        forms.insert(form.id.clone(), form);
        Ok(())
    }

    /// Stores a record, assigning an identifier when it has none.
    pub fn insert(&self, mut record: Record) -> StoreResult<String> {
        if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        }
        let id = record.id.clone();
        let document = record.to_document()?;

        let mut records = self.records.write().map_err(poisoned)?;
        records.insert(id.clone(), document);
        Ok(id)
    }

    pub fn get(&self, id: &str) -> StoreResult<Option<Record>> {
        let records = self.records.read().map_err(poisoned)?;
        records
            .get(id)
            .cloned()
            .map(Record::from_document)
            .transpose()
    }

    /// Sets the deletion marker on a record.
    pub fn soft_delete(&self, id: &str) -> StoreResult<bool> {
        let mut records = self.records.write().map_err(poisoned)?;
        match records.get_mut(id).and_then(Value::as_object_mut) {
            Some(doc) => {
                doc.insert("deleted".into(), Value::String(Utc::now().to_rfc3339()));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes a record outright.
    pub fn remove(&self, id: &str) -> StoreResult<bool> {
        let mut records = self.records.write().map_err(poisoned)?;
        Ok(records.shift_remove(id).is_some())
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Makes every subsequent query fail (or succeed again).
    pub fn set_query_failure(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent update fail (or succeed again).
    pub fn set_update_failure(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Number of partial updates applied so far.
    pub fn updates_applied(&self) -> usize {
        self.updates_applied.load(Ordering::SeqCst)
    }

    fn check_query(&self) -> StoreResult<()> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated query failure".into()));
        }
        Ok(())
    }

    fn matching_records(&self, query: &Query, limit: Option<usize>) -> StoreResult<Vec<Record>> {
        self.check_query()?;
        let records = self.records.read().map_err(poisoned)?;
        records
            .values()
            .filter(|doc| query.matches(doc))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .map(Record::from_document)
            .collect()
    }
}

impl RecordStore for MemoryStore {
    async fn find_one(&self, query: &Query) -> StoreResult<Option<Record>> {
        Ok(self.matching_records(query, Some(1))?.into_iter().next())
    }

    async fn find(&self, query: &Query) -> StoreResult<Cursor<Record>> {
        Ok(Cursor::snapshot(self.matching_records(query, None)?))
    }

    async fn update(&self, id: &str, update: &PartialUpdate) -> StoreResult<bool> {
        tokio::task::yield_now().await;

        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::update_failed(id, "simulated update failure"));
        }

        let mut records = self.records.write().map_err(poisoned)?;
        let Some(current) = records.get_mut(id) else {
            return Ok(false);
        };
        let updated = update.apply_to(current)?;
        *current = updated;
        self.updates_applied.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

impl FormSource for MemoryStore {
    async fn get_form(&self, id: &str) -> StoreResult<Option<Form>> {
        self.check_query()?;
        let forms = self.forms.read().map_err(poisoned)?;
        Ok(forms.get(id).cloned())
    }

    async fn find_forms(&self, query: &Query) -> StoreResult<Cursor<Form>> {
        self.check_query()?;
        let forms = self.forms.read().map_err(poisoned)?;
        let mut matched = Vec::new();
        for form in forms.values() {
            let document =
                serde_json::to_value(form).map_err(|e| StoreError::Corrupt(e.to_string()))?;
            if query.matches(&document) {
                matched.push(form.clone());
            }
        }
        Ok(Cursor::snapshot(matched))
    }
}
