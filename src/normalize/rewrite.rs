//! Per-record case rewrites for unique fields

use indexmap::IndexMap;
use serde_json::Value;

use crate::form::{each_component_with_path, Form};
use crate::schema::canonical_value;
use crate::store::{resolve_path, PartialUpdate, Record, RecordData};

/// Maps each unique field key of `form` to its data path.
pub fn unique_paths(form: &Form) -> IndexMap<String, String> {
    let mut paths = IndexMap::new();
    each_component_with_path(&form.components, &mut |def, path| {
        if !def.unique {
            return;
        }
        if let Some(key) = def.field_key() {
            paths.insert(key.to_string(), path.to_string());
        }
    });
    paths
}

/// Builds the update that lowercases every unique value of `record`.
///
/// Non-empty strings and arrays holding at least one string are rewritten
/// the way structural validation stores them: string elements are
/// lowercased, holes and other elements are kept. Values already in
/// canonical form contribute nothing, so a fully normalized record yields
/// an empty update.
pub fn plan_rewrite(record: &Record, paths: &IndexMap<String, String>) -> PartialUpdate {
    let mut update = PartialUpdate::new();
    for path in paths.values() {
        let Some(current) = lookup(&record.data, path) else {
            continue;
        };
        if let Some(lowered) = lowercased(current) {
            if &lowered != current {
                update.set(format!("data.{}", path), lowered);
            }
        }
    }
    update
}

fn lookup<'a>(data: &'a RecordData, path: &str) -> Option<&'a Value> {
    match path.split_once('.') {
        Some((head, rest)) => data.get(head).and_then(|v| resolve_path(v, rest)),
        None => data.get(path),
    }
}

fn lowercased(value: &Value) -> Option<Value> {
    let rewritable = match value {
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => items.iter().any(Value::is_string),
        _ => false,
    };
    rewritable.then(|| canonical_value(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{Component, FieldDefinition};
    use serde_json::json;

    fn record(data: Value) -> Record {
        Record::new("r1", "f", data.as_object().cloned().unwrap())
    }

    fn paths(entries: &[(&str, &str)]) -> IndexMap<String, String> {
        entries
            .iter()
            .map(|(k, p)| (k.to_string(), p.to_string()))
            .collect()
    }

    #[test]
    fn test_unique_paths_include_nested_fields() {
        let mut tree = FieldDefinition::layout("container");
        tree.key = Some("address".into());
        tree.extra.insert("tree".into(), json!(true));
        let form = Form::new(
            "f",
            vec![
                Component::leaf(FieldDefinition::new("email", "email").unique()),
                Component::leaf(FieldDefinition::new("name", "textfield")),
                Component::columns(vec![vec![Component::leaf(
                    FieldDefinition::new("tag", "textfield").unique(),
                )]]),
                Component::ComponentGroup {
                    meta: tree,
                    components: vec![Component::leaf(FieldDefinition::new("zip", "textfield").unique())],
                },
            ],
        );
        assert_eq!(
            unique_paths(&form),
            paths(&[("email", "email"), ("tag", "tag"), ("zip", "address.zip")])
        );
    }

    #[test]
    fn test_rewrites_mixed_case_values() {
        let update = plan_rewrite(
            &record(json!({"email": "A@B.com", "tags": ["X", "y"], "n": 5})),
            &paths(&[("email", "email"), ("tags", "tags"), ("n", "n")]),
        );
        assert_eq!(update.len(), 2);
        assert_eq!(update.get("data.email"), Some(&json!("a@b.com")));
        assert_eq!(update.get("data.tags"), Some(&json!(["x", "y"])));
    }

    #[test]
    fn test_lowercase_record_needs_no_update() {
        let update = plan_rewrite(
            &record(json!({"email": "a@b.com", "tags": ["x"]})),
            &paths(&[("email", "email"), ("tags", "tags")]),
        );
        assert!(update.is_empty());
    }

    #[test]
    fn test_skips_values_without_strings() {
        let update = plan_rewrite(
            &record(json!({"a": "", "b": [], "c": [1, null], "d": null})),
            &paths(&[("a", "a"), ("b", "b"), ("c", "c"), ("d", "d"), ("e", "e")]),
        );
        assert!(update.is_empty());
    }

    #[test]
    fn test_arrays_with_holes_rewritten() {
        let update = plan_rewrite(
            &record(json!({"tags": ["A", null], "codes": ["X", 1], "done": ["a", null]})),
            &paths(&[("tags", "tags"), ("codes", "codes"), ("done", "done")]),
        );
        assert_eq!(update.len(), 2);
        assert_eq!(update.get("data.tags"), Some(&json!(["a", null])));
        assert_eq!(update.get("data.codes"), Some(&json!(["x", 1])));
    }

    #[test]
    fn test_nested_path() {
        let update = plan_rewrite(
            &record(json!({"address": {"zip": "AB1"}})),
            &paths(&[("zip", "address.zip")]),
        );
        assert_eq!(update.get("data.address.zip"), Some(&json!("ab1")));
    }
}
