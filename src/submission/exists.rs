//! Existence lookup by submitted values

use serde_json::Value;

use crate::form::{each_component, Form};
use crate::schema::canonical_value;
use crate::store::{Query, RecordData, RecordStore, StoreResult};

/// Returns the id of a live record of `form` matching every usable
/// criterion.
///
/// Only criteria naming a persistent, non-protected field are used. With
/// no usable criterion nothing is looked up. Criteria on unique fields are
/// lowercased first, matching how those values are stored.
pub async fn find_existing<S: RecordStore>(
    store: &S,
    form: &Form,
    criteria: &RecordData,
) -> StoreResult<Option<String>> {
    let mut clauses = Vec::new();
    each_component(&form.components, &mut |field| {
        let Some(key) = field.field_key() else {
            return;
        };
        if field.protected || !field.persistent {
            return;
        }
        if let Some(value) = criteria.get(key) {
            let value = if field.unique {
                canonical_value(value)
            } else {
                value.clone()
            };
            clauses.push(Query::eq(format!("data.{}", key), value));
        }
    });

    if clauses.is_empty() {
        return Ok(None);
    }

    clauses.push(Query::eq("form", Value::String(form.id.clone())));
    clauses.push(Query::is_null("deleted"));
    let found = store.find_one(&Query::and(clauses)).await?;
    Ok(found.map(|record| record.id))
}
