//! Document query predicates
//!
//! Queries address fields by dotted path and are evaluated against JSON
//! documents. Matching follows document-store conventions:
//! - equality against `null` matches a missing field as well as an explicit null
//! - equality against a scalar matches an array containing that scalar
//! - numbers compare by value, so `1` equals `1.0`
//! - negated membership matches a missing field

use serde_json::Value;

/// A predicate over a JSON document.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Field equals value
    Eq(String, Value),
    /// Field equals one of the values
    In(String, Vec<Value>),
    /// Field equals none of the values
    NotIn(String, Vec<Value>),
    /// Field presence (`true`) or absence (`false`)
    Exists(String, bool),
    /// Field is an array with at least one element matching the inner query
    ElemMatch(String, Box<Query>),
    /// Every sub-query matches
    And(Vec<Query>),
    /// At least one sub-query matches
    Or(Vec<Query>),
}

impl Query {
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Query::Eq(field.into(), value)
    }

    /// Field is missing or null.
    pub fn is_null(field: impl Into<String>) -> Self {
        Query::Eq(field.into(), Value::Null)
    }

    pub fn in_values(field: impl Into<String>, values: Vec<Value>) -> Self {
        Query::In(field.into(), values)
    }

    pub fn not_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Query::NotIn(field.into(), values)
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Query::Exists(field.into(), true)
    }

    pub fn elem_match(field: impl Into<String>, inner: Query) -> Self {
        Query::ElemMatch(field.into(), Box::new(inner))
    }

    pub fn and(queries: Vec<Query>) -> Self {
        Query::And(queries)
    }

    pub fn or(queries: Vec<Query>) -> Self {
        Query::Or(queries)
    }

    /// Checks whether a document satisfies this query.
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Query::Eq(field, expected) => {
                let actual = resolve_path(document, field);
                eq_match(actual, expected)
            }
            Query::In(field, values) => {
                let actual = resolve_path(document, field);
                values.iter().any(|v| eq_match(actual, v))
            }
            Query::NotIn(field, values) => {
                let actual = resolve_path(document, field);
                !values.iter().any(|v| eq_match(actual, v))
            }
            Query::Exists(field, wanted) => resolve_path(document, field).is_some() == *wanted,
            Query::ElemMatch(field, inner) => match resolve_path(document, field) {
                Some(Value::Array(items)) => items.iter().any(|item| inner.matches(item)),
                _ => false,
            },
            Query::And(queries) => queries.iter().all(|q| q.matches(document)),
            Query::Or(queries) => queries.iter().any(|q| q.matches(document)),
        }
    }
}

/// Resolves a dotted path through objects (and numeric array indexes).
pub fn resolve_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(document, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn eq_match(actual: Option<&Value>, expected: &Value) -> bool {
    match (actual, expected) {
        (None, Value::Null) => true,
        (None, _) => false,
        (Some(actual), expected) => {
            if values_equal(actual, expected) {
                return true;
            }
            match (actual, expected) {
                (Value::Array(items), expected) if !expected.is_array() => {
                    items.iter().any(|item| values_equal(item, expected))
                }
                _ => false,
            }
        }
    }
}

/// Structural equality with numeric comparison by value.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_equality() {
        let doc = json!({"form": "f1", "data": {"email": "a@b.com"}});

        assert!(Query::eq("data.email", json!("a@b.com")).matches(&doc));
        assert!(!Query::eq("data.email", json!("A@B.COM")).matches(&doc));
        assert!(!Query::eq("data.missing", json!("x")).matches(&doc));
    }

    #[test]
    fn test_null_matches_missing_or_null() {
        assert!(Query::is_null("deleted").matches(&json!({"_id": "1"})));
        assert!(Query::is_null("deleted").matches(&json!({"deleted": null})));
        assert!(!Query::is_null("deleted").matches(&json!({"deleted": "2024-01-01T00:00:00Z"})));
    }

    #[test]
    fn test_no_type_coercion() {
        let doc = json!({"value": 123});
        assert!(!Query::eq("value", json!("123")).matches(&doc));
        assert!(Query::eq("value", json!(123.0)).matches(&doc));
    }

    #[test]
    fn test_scalar_matches_array_element() {
        let doc = json!({"data": {"tags": ["a", "b"]}});
        assert!(Query::eq("data.tags", json!("b")).matches(&doc));
        assert!(Query::eq("data.tags", json!(["a", "b"])).matches(&doc));
        assert!(!Query::eq("data.tags", json!(["b", "a"])).matches(&doc));
    }

    #[test]
    fn test_membership() {
        let doc = json!({"_id": "r1"});
        assert!(Query::in_values("_id", vec![json!("r0"), json!("r1")]).matches(&doc));
        assert!(!Query::not_in("_id", vec![json!("r1")]).matches(&doc));
        assert!(Query::not_in("_id", vec![json!("r2")]).matches(&doc));
        assert!(Query::not_in("owner", vec![json!("u1")]).matches(&doc));
    }

    #[test]
    fn test_exists_and_elem_match() {
        let form = json!({
            "components": [
                {"key": "a", "type": "textfield"},
                {"type": "columns", "columns": [{"components": [{"key": "tag", "unique": true}]}]}
            ]
        });

        assert!(Query::elem_match("components", Query::exists("columns")).matches(&form));
        assert!(!Query::elem_match("components", Query::exists("rows")).matches(&form));

        let nested_unique = Query::elem_match(
            "components",
            Query::elem_match(
                "columns",
                Query::elem_match("components", Query::eq("unique", json!(true))),
            ),
        );
        assert!(nested_unique.matches(&form));
        assert!(!Query::elem_match("components", Query::eq("unique", json!(true))).matches(&form));
    }

    #[test]
    fn test_and_or() {
        let doc = json!({"a": 1, "b": 2});
        assert!(Query::and(vec![Query::eq("a", json!(1)), Query::eq("b", json!(2))]).matches(&doc));
        assert!(!Query::and(vec![Query::eq("a", json!(1)), Query::eq("b", json!(3))]).matches(&doc));
        assert!(Query::or(vec![Query::eq("a", json!(9)), Query::eq("b", json!(2))]).matches(&doc));
        assert!(!Query::or(vec![]).matches(&doc));
    }

    #[test]
    fn test_resolve_path_through_array_index() {
        let doc = json!({"rows": [{"x": 1}, {"x": 2}]});
        assert_eq!(resolve_path(&doc, "rows.1.x"), Some(&json!(2)));
        assert_eq!(resolve_path(&doc, "rows.5.x"), None);
    }
}
