//! Submission envelope

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::store::{Record, RecordData};

/// A record as submitted for one form.
///
/// `data` is optional: envelopes without data skip validation entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub form: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<RecordData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Submission {
    pub fn new(form: impl Into<String>, data: RecordData) -> Self {
        Self {
            id: None,
            form: form.into(),
            data: Some(data),
            deleted: None,
            extra: Map::new(),
        }
    }

    /// An envelope carrying no data.
    pub fn empty(form: impl Into<String>) -> Self {
        Self {
            data: None,
            ..Self::new(form, RecordData::new())
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.is_some()
    }
}

impl From<Record> for Submission {
    fn from(record: Record) -> Self {
        Self {
            id: Some(record.id),
            form: record.form,
            data: Some(record.data),
            deleted: record.deleted,
            extra: record.extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shape() {
        let submission: Submission = serde_json::from_value(json!({
            "_id": "s1",
            "form": "contact",
            "data": {"email": "a@b.com"},
            "owner": "u1"
        }))
        .unwrap();
        assert_eq!(submission.id.as_deref(), Some("s1"));
        assert_eq!(submission.extra["owner"], json!("u1"));
        assert!(!submission.is_deleted());
    }

    #[test]
    fn test_missing_data_is_none() {
        let submission: Submission =
            serde_json::from_value(json!({"form": "contact"})).unwrap();
        assert!(submission.data.is_none());
        assert_eq!(submission, Submission::empty("contact"));
    }

    #[test]
    fn test_from_record() {
        let mut data = RecordData::new();
        data.insert("a".into(), json!(1));
        let submission = Submission::from(Record::new("r1", "f", data));
        assert_eq!(submission.id.as_deref(), Some("r1"));
        assert_eq!(submission.data.unwrap()["a"], json!(1));
    }
}
