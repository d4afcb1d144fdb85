//! Collaborator interfaces consumed by the validation core

use std::future::Future;

use super::errors::StoreResult;
use super::query::Query;
use super::record::{Cursor, PartialUpdate, Record};
use crate::form::Form;

/// Persistent record storage.
pub trait RecordStore: Send + Sync {
    /// Returns the first record matching the query, in store order.
    fn find_one(&self, query: &Query) -> impl Future<Output = StoreResult<Option<Record>>> + Send;

    /// Opens a point-in-time cursor over every matching record.
    fn find(&self, query: &Query) -> impl Future<Output = StoreResult<Cursor<Record>>> + Send;

    /// Applies a partial update to one record atomically.
    ///
    /// Returns `false` when no record with that identifier exists any more.
    fn update(
        &self,
        id: &str,
        update: &PartialUpdate,
    ) -> impl Future<Output = StoreResult<bool>> + Send;
}

/// Read-only access to form definitions.
pub trait FormSource: Send + Sync {
    fn get_form(&self, id: &str) -> impl Future<Output = StoreResult<Option<Form>>> + Send;

    /// Opens a point-in-time cursor over every form whose definition
    /// document matches the query.
    fn find_forms(&self, query: &Query) -> impl Future<Output = StoreResult<Cursor<Form>>> + Send;
}
