//! Stored records, partial updates and snapshot cursors

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::{StoreError, StoreResult};

/// Submitted values keyed by top-level field key.
pub type RecordData = Map<String, Value>;

/// A stored submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "_id")]
    pub id: String,
    /// Owning form identifier
    pub form: String,
    #[serde(default)]
    pub data: RecordData,
    /// Soft-deletion marker; set means deleted
    #[serde(default)]
    pub deleted: Option<DateTime<Utc>>,
    /// Envelope attributes owned by the surrounding system
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>, form: impl Into<String>, data: RecordData) -> Self {
        Self {
            id: id.into(),
            form: form.into(),
            data,
            deleted: None,
            extra: Map::new(),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.is_some()
    }

    /// Converts a stored document into a record.
    pub fn from_document(document: Value) -> StoreResult<Self> {
        serde_json::from_value(document).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    pub fn to_document(&self) -> StoreResult<Value> {
        serde_json::to_value(self).map_err(|e| StoreError::Corrupt(e.to_string()))
    }
}

/// A set of dotted-path assignments applied to one record as a unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialUpdate {
    set: BTreeMap<String, Value>,
}

impl PartialUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, path: impl Into<String>, value: Value) {
        self.set.insert(path.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.set.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.set.iter()
    }

    /// Applies every assignment or none of them.
    ///
    /// Missing intermediate objects are created; a non-object intermediate
    /// rejects the whole update.
    pub fn apply_to(&self, document: &Value) -> StoreResult<Value> {
        let mut updated = document.clone();
        for (path, value) in &self.set {
            assign(&mut updated, path, value.clone())?;
        }
        Ok(updated)
    }
}

fn assign(document: &mut Value, path: &str, value: Value) -> StoreResult<()> {
    let mut segments: Vec<&str> = path.split('.').collect();
    let last = segments
        .pop()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| StoreError::QueryFailed(format!("empty update path '{}'", path)))?;

    let mut current = document;
    for segment in segments {
        let obj = current.as_object_mut().ok_or_else(|| {
            StoreError::QueryFailed(format!("cannot assign '{}' through a non-object", path))
        })?;
        current = obj
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    let obj = current.as_object_mut().ok_or_else(|| {
        StoreError::QueryFailed(format!("cannot assign '{}' through a non-object", path))
    })?;
    obj.insert(last.to_string(), value);
    Ok(())
}

/// A point-in-time result set.
///
/// Items are captured when the cursor is opened; writes that land afterwards
/// neither add to nor remove from the iteration.
#[derive(Debug)]
pub struct Cursor<T> {
    items: std::vec::IntoIter<T>,
}

impl<T> Cursor<T> {
    pub fn snapshot(items: Vec<T>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }

    /// Items not yet consumed.
    pub fn remaining(&self) -> usize {
        self.items.len()
    }
}

impl<T> Iterator for Cursor<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.items.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_document_shape() {
        let mut data = RecordData::new();
        data.insert("email".into(), json!("a@b.com"));
        let record = Record::new("r1", "f1", data);

        let doc = record.to_document().unwrap();
        assert_eq!(doc["_id"], "r1");
        assert_eq!(doc["form"], "f1");
        assert_eq!(doc["data"]["email"], "a@b.com");
        assert!(doc["deleted"].is_null());

        let back = Record::from_document(doc).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_partial_update_creates_intermediates() {
        let mut update = PartialUpdate::new();
        update.set("data.tag", json!("tag"));
        update.set("data.user.data.name", json!("bob"));

        let doc = json!({"_id": "r1", "data": {"tag": "Tag", "keep": 1}});
        let updated = update.apply_to(&doc).unwrap();

        assert_eq!(updated["data"]["tag"], "tag");
        assert_eq!(updated["data"]["keep"], 1);
        assert_eq!(updated["data"]["user"]["data"]["name"], "bob");
    }

    #[test]
    fn test_partial_update_is_all_or_nothing() {
        let mut update = PartialUpdate::new();
        update.set("a", json!(1));
        update.set("data.scalar.inner", json!(2));

        let doc = json!({"data": {"scalar": "x"}});
        assert!(update.apply_to(&doc).is_err());
        assert_eq!(doc, json!({"data": {"scalar": "x"}}));
    }

    #[test]
    fn test_cursor_is_snapshot() {
        let mut source = vec![1, 2, 3];
        let mut cursor = Cursor::snapshot(source.clone());
        source.push(4);

        assert_eq!(cursor.remaining(), 3);
        assert_eq!(cursor.next(), Some(1));
        assert_eq!(cursor.collect::<Vec<_>>(), vec![2, 3]);
    }
}
