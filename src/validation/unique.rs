//! Cross-record uniqueness checks
//!
//! Fields are checked one at a time in registration order; the first
//! failure ends the check. Store round-trips are never issued
//! concurrently for one record.

use serde_json::Value;

use super::errors::{ValidationError, ValidationResult};
use crate::observability::{Event, Logger};
use crate::schema::{canonical_value, check_field, CompiledValidator};
use crate::store::{Query, RecordData, RecordStore};

/// Checks unique fields of one record against the store.
pub struct UniquenessChecker<'a, S: RecordStore> {
    store: &'a S,
}

impl<'a, S: RecordStore> UniquenessChecker<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Checks every unique field of `data`.
    ///
    /// Each value is looked up in the form the structural step will store
    /// it in, so a record accepted once is found again by an identical
    /// submission.
    ///
    /// A blank directly owned field fails with `FORM_UNIQUE_REQUIRED`; a
    /// blank embedded field (key containing `.`) is skipped. A live record
    /// of the same form holding the value fails with
    /// `FORM_UNIQUE_CONFLICT`, unless it is `record_id` itself.
    ///
    /// # Errors
    ///
    /// Store failures are returned unchanged as `FORM_STORE_FAILED`.
    pub async fn check_all(
        &self,
        validator: &CompiledValidator,
        data: &RecordData,
        record_id: Option<&str>,
    ) -> ValidationResult<()> {
        let form_id = validator.form_id();

        for (key, field) in validator.unique_fields() {
            let stored = match data.get(key) {
                Some(value) if !is_blank(value) => stored_value(validator, key, value),
                _ => None,
            };
            let value = match stored {
                Some(value) => value,
                None if field.is_embedded() => continue,
                None => return Err(ValidationError::unique_required(key)),
            };

            let query = unique_query(form_id, key, &value);
            let Some(existing) = self.store.find_one(&query).await? else {
                continue;
            };

            if record_id == Some(existing.id.as_str()) {
                continue;
            }

            Logger::event(
                Event::UniqueConflict,
                &[
                    ("form_id", form_id),
                    ("field", key.as_str()),
                    ("existing_id", existing.id.as_str()),
                ],
            );
            return Err(ValidationError::unique_conflict(key, &field.display_label()));
        }
        Ok(())
    }
}

/// The value structural validation would store for `key`.
///
/// `None` when coercion leaves nothing to store. A value that fails
/// structural checks is compared in plain canonical form; the structural
/// stage reports it later.
fn stored_value(validator: &CompiledValidator, key: &str, value: &Value) -> Option<Value> {
    let Some(rule) = validator.rule(key) else {
        return Some(canonical_value(value));
    };
    match check_field(rule, Some(value)) {
        Ok(stored) => stored,
        Err(_) => Some(canonical_value(value)),
    }
}

/// Same form, same canonical value, not soft-deleted.
pub fn unique_query(form_id: &str, key: &str, value: &Value) -> Query {
    Query::and(vec![
        Query::eq("form", Value::String(form_id.to_string())),
        Query::eq(format!("data.{}", key), canonical_value(value)),
        Query::is_null("deleted"),
    ])
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{Component, FieldDefinition, Form};
    use crate::store::{MemoryStore, Record, StoreError};
    use crate::validation::ValidationErrorCode;
    use serde_json::json;

    fn data(value: Value) -> RecordData {
        value.as_object().cloned().unwrap()
    }

    fn compile(id: &str, fields: Vec<FieldDefinition>) -> CompiledValidator {
        let form = Form::new(id, fields.into_iter().map(Component::leaf).collect());
        CompiledValidator::compile(&form).unwrap()
    }

    fn contact() -> CompiledValidator {
        compile(
            "contact",
            vec![FieldDefinition::new("email", "email").unique().with_label("Email")],
        )
    }

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert(Record::new("r1", "contact", data(json!({"email": "a@b.com"}))))
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_conflict_is_case_insensitive() {
        let store = seeded_store();
        let checker = UniquenessChecker::new(&store);
        let err = checker
            .check_all(&contact(), &data(json!({"email": "A@B.COM"})), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ValidationErrorCode::FormUniqueConflict);
        assert_eq!(err.message(), "Email must be unique.");
    }

    #[tokio::test]
    async fn test_self_exclusion() {
        let store = seeded_store();
        let checker = UniquenessChecker::new(&store);
        let result = checker
            .check_all(&contact(), &data(json!({"email": "a@b.com"})), Some("r1"))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_other_form_and_deleted_records_ignored() {
        let store = seeded_store();
        store
            .insert(Record::new("r2", "other", data(json!({"email": "x@y.com"}))))
            .unwrap();
        store
            .insert(Record::new("r3", "contact", data(json!({"email": "gone@y.com"}))))
            .unwrap();
        store.soft_delete("r3").unwrap();

        let checker = UniquenessChecker::new(&store);
        for email in ["x@y.com", "gone@y.com"] {
            let result = checker
                .check_all(&contact(), &data(json!({"email": email})), None)
                .await;
            assert!(result.is_ok(), "{} should be free", email);
        }
    }

    #[tokio::test]
    async fn test_blank_owned_field_required() {
        let store = MemoryStore::new();
        let checker = UniquenessChecker::new(&store);
        for record in [json!({}), json!({"email": ""}), json!({"email": null})] {
            let err = checker
                .check_all(&contact(), &data(record), None)
                .await
                .unwrap_err();
            assert_eq!(err.code(), ValidationErrorCode::FormUniqueRequired);
        }
    }

    #[tokio::test]
    async fn test_blank_embedded_field_tolerated() {
        let store = MemoryStore::new();
        let validator = compile(
            "contact",
            vec![FieldDefinition::new("user.email", "email").unique()],
        );
        let checker = UniquenessChecker::new(&store);
        assert!(checker
            .check_all(&validator, &data(json!({})), None)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_first_failure_stops_checks() {
        let store = seeded_store();
        store.set_query_failure(true);
        let validator = compile(
            "contact",
            vec![
                FieldDefinition::new("code", "textfield").unique(),
                FieldDefinition::new("email", "email").unique(),
            ],
        );

        let checker = UniquenessChecker::new(&store);
        // `code` is blank, so the store is never queried
        let err = checker
            .check_all(&validator, &data(json!({"email": "a@b.com"})), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ValidationErrorCode::FormUniqueRequired);
    }

    #[tokio::test]
    async fn test_store_failure_passes_through() {
        let store = seeded_store();
        store.set_query_failure(true);
        let checker = UniquenessChecker::new(&store);
        let err = checker
            .check_all(&contact(), &data(json!({"email": "a@b.com"})), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ValidationErrorCode::FormStoreFailed);
        assert!(matches!(err.store_error(), Some(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_lookup_uses_stored_form_of_value() {
        let validator = compile(
            "shop",
            vec![
                FieldDefinition::new("plan", "select").unique(),
                FieldDefinition::new("aliases", "textfield").unique().multiple(),
                FieldDefinition::new("badge", "number").unique(),
            ],
        );
        let submitted = data(json!({"plan": "GOLD", "aliases": ["A", ""], "badge": "7"}));
        let stored = validator.apply(&submitted).unwrap();
        assert_eq!(stored["aliases"], json!(["a", null]));

        let store = MemoryStore::new();
        store.insert(Record::new("s1", "shop", stored)).unwrap();

        let checker = UniquenessChecker::new(&store);
        let err = checker
            .check_all(&validator, &submitted, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ValidationErrorCode::FormUniqueConflict);
        assert_eq!(err.details()[0].path, "plan");

        // Each field on its own still collides with the stored record
        for (key, field_value) in [("aliases", json!(["A", ""])), ("badge", json!("7"))] {
            let mut fresh = data(json!({"plan": "silver", "aliases": ["z"], "badge": 1}));
            fresh.insert(key.to_string(), field_value);
            let err = checker.check_all(&validator, &fresh, None).await.unwrap_err();
            assert_eq!(err.details()[0].path, key);
        }
    }

    #[test]
    fn test_unique_query_is_canonical() {
        let query = unique_query("f", "tags", &json!(["A", null]));
        let document = json!({"form": "f", "data": {"tags": ["a", null]}});
        assert!(query.matches(&document));
    }
}
