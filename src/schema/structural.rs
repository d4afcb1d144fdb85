//! Structural validation and coercion
//!
//! Produces the canonical record: declared keys and `_id` only, numeric
//! strings coerced, blank optional values dropped, unique strings
//! lowercased. Every violation is collected rather than stopping at the
//! first.

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Number, Value};

use super::errors::{ErrorDetail, StructuralResult};
use super::rules::{FieldRule, NumberBounds, Precision, TypeRule};
use crate::store::RecordData;

/// Identifier key accepted on every record
pub const ID_KEY: &str = "_id";

const EMAIL_PATTERN: &str =
    r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$";

static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();

fn is_email(value: &str) -> bool {
    EMAIL
        .get_or_init(|| Regex::new(EMAIL_PATTERN).ok())
        .as_ref()
        .map_or(false, |re| re.is_match(value))
}

/// Validates `data` against `rules` and returns the canonical record.
pub fn apply(rules: &IndexMap<String, FieldRule>, data: &RecordData) -> StructuralResult<RecordData> {
    let mut output = RecordData::new();
    let mut errors = Vec::new();

    match data.get(ID_KEY) {
        None => {}
        Some(Value::String(id)) => {
            output.insert(ID_KEY.to_string(), Value::String(id.clone()));
        }
        Some(_) => errors.push(ErrorDetail::not_a_string(ID_KEY)),
    }

    for (key, rule) in rules {
        match check_field(rule, data.get(key)) {
            Ok(Some(value)) => {
                output.insert(key.clone(), value);
            }
            Ok(None) => {}
            Err(mut details) => errors.append(&mut details),
        }
    }

    if errors.is_empty() {
        Ok(output)
    } else {
        Err(errors)
    }
}

/// Canonical comparable form of a unique value.
///
/// Strings are lowercased, as are the string elements of an array; every
/// other value, including `null` holes, is kept as is.
pub fn canonical_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.to_lowercase()),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Value::String(s.to_lowercase()),
                    other => other.clone(),
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Checks one field. `Ok(None)` means the key is omitted from the output.
pub fn check_field(rule: &FieldRule, value: Option<&Value>) -> StructuralResult<Option<Value>> {
    if !rule.multiple {
        return check_value(rule, &rule.key, value, rule.required);
    }

    let items = match value {
        None | Some(Value::Null) => return absent(&rule.key, rule.required),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(vec![ErrorDetail::not_an_array(&rule.key)]),
    };

    let mut output = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let path = format!("{}[{}]", rule.key, index);
        match check_value(rule, &path, Some(item), false) {
            Ok(Some(value)) => output.push(value),
            // Sparse: blank elements are kept as holes
            Ok(None) => output.push(Value::Null),
            Err(mut details) => errors.append(&mut details),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    if rule.required && output.iter().all(Value::is_null) {
        return Err(vec![ErrorDetail::empty(&rule.key)]);
    }
    Ok(Some(Value::Array(output)))
}

fn absent(path: &str, required: bool) -> StructuralResult<Option<Value>> {
    if required {
        Err(vec![ErrorDetail::required(path)])
    } else {
        Ok(None)
    }
}

fn check_value(
    rule: &FieldRule,
    path: &str,
    value: Option<&Value>,
    required: bool,
) -> StructuralResult<Option<Value>> {
    let value = match value {
        None | Some(Value::Null) => return absent(path, required),
        Some(value) => value,
    };

    match &rule.type_rule {
        TypeRule::Opaque if rule.canonical_case => Ok(Some(canonical_value(value))),
        TypeRule::Opaque => Ok(Some(value.clone())),
        TypeRule::Number { precision, bounds } => check_number(path, value, required, *precision, bounds),
        text_rule => {
            let Value::String(text) = value else {
                return Err(vec![ErrorDetail::not_a_string(path)]);
            };
            if text.is_empty() {
                return if required {
                    Err(vec![ErrorDetail::empty(path)])
                } else {
                    Ok(None)
                };
            }
            check_text(rule, text_rule, path, text)
        }
    }
}

fn check_text(
    rule: &FieldRule,
    type_rule: &TypeRule,
    path: &str,
    text: &str,
) -> StructuralResult<Option<Value>> {
    let mut errors = Vec::new();

    match type_rule {
        TypeRule::Text { min_length, max_length } => {
            let length = text.chars().count();
            if let Some(min) = *min_length {
                if length < min {
                    errors.push(ErrorDetail::too_short(path, min));
                }
            }
            if let Some(max) = *max_length {
                if length > max {
                    errors.push(ErrorDetail::too_long(path, max));
                }
            }
        }
        TypeRule::Email => {
            if !is_email(text) {
                errors.push(ErrorDetail::invalid_email(path));
            }
        }
        TypeRule::Number { .. } | TypeRule::Opaque => {}
    }

    if let Some(pattern) = &rule.pattern {
        if !pattern.is_match(text) {
            errors.push(ErrorDetail::pattern_mismatch(path, text, pattern.as_str()));
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    let canonical = if rule.canonical_case {
        text.to_lowercase()
    } else {
        text.to_string()
    };
    Ok(Some(Value::String(canonical)))
}

fn check_number(
    path: &str,
    value: &Value,
    required: bool,
    precision: Precision,
    bounds: &NumberBounds,
) -> StructuralResult<Option<Value>> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => return absent(path, required),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    };
    let Some(number) = number else {
        return Err(vec![ErrorDetail::not_a_number(path)]);
    };

    let mut errors = Vec::new();
    match precision {
        Precision::Unconstrained => {}
        Precision::Integer => {
            if number.fract() != 0.0 {
                errors.push(ErrorDetail::not_an_integer(path));
            }
        }
        Precision::Decimals(allowed) => {
            if decimal_places(number) > allowed {
                errors.push(ErrorDetail::too_precise(path, allowed));
            }
        }
    }

    if let Some(min) = bounds.min.filter(|min| number < *min) {
        errors.push(ErrorDetail::out_of_range(path, "min", min));
    }
    if let Some(max) = bounds.max.filter(|max| number > *max) {
        errors.push(ErrorDetail::out_of_range(path, "max", max));
    }
    if let Some(greater) = bounds.greater.filter(|greater| number <= *greater) {
        errors.push(ErrorDetail::out_of_range(path, "greater", greater));
    }
    if let Some(less) = bounds.less.filter(|less| number >= *less) {
        errors.push(ErrorDetail::out_of_range(path, "less", less));
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(Some(match value {
        Value::Number(_) => value.clone(),
        _ => number_value(number),
    }))
}

/// Digits after the decimal point in the shortest round-trip rendering.
fn decimal_places(number: f64) -> usize {
    let rendered = number.to_string();
    rendered.split_once('.').map_or(0, |(_, fraction)| fraction.len())
}

fn number_value(number: f64) -> Value {
    if number.fract() == 0.0 && number.abs() < 9_007_199_254_740_992.0 {
        Value::from(number as i64)
    } else {
        Number::from_f64(number).map_or(Value::Null, Value::Number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{FieldDefinition, ValidateRules};
    use serde_json::json;

    fn rules(fields: Vec<FieldDefinition>) -> IndexMap<String, FieldRule> {
        fields
            .iter()
            .map(|f| {
                let key = f.field_key().unwrap().to_string();
                let rule = FieldRule::compile(&key, f).unwrap();
                (key, rule)
            })
            .collect()
    }

    fn data(value: Value) -> RecordData {
        value.as_object().cloned().unwrap()
    }

    fn required() -> ValidateRules {
        ValidateRules {
            required: true,
            ..ValidateRules::default()
        }
    }

    #[test]
    fn test_strips_unknown_keys_and_keeps_id() {
        let rules = rules(vec![FieldDefinition::new("name", "textfield")]);
        let out = apply(&rules, &data(json!({"_id": "r1", "name": "Ann", "junk": 1}))).unwrap();
        assert_eq!(Value::Object(out), json!({"_id": "r1", "name": "Ann"}));
    }

    #[test]
    fn test_blank_optional_text_is_dropped() {
        let rules = rules(vec![FieldDefinition::new("name", "textfield")]);
        let out = apply(&rules, &data(json!({"name": ""}))).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_required_text() {
        let rules = rules(vec![FieldDefinition::new("name", "textfield").with_validate(required())]);

        let errs = apply(&rules, &data(json!({}))).unwrap_err();
        assert_eq!(errs[0].detail_type, "any.required");

        let errs = apply(&rules, &data(json!({"name": ""}))).unwrap_err();
        assert_eq!(errs[0].detail_type, "any.empty");
    }

    #[test]
    fn test_length_limits() {
        let field = FieldDefinition::new("code", "textarea").with_validate(ValidateRules {
            min_length: Some(2.0),
            max_length: Some(4.0),
            ..ValidateRules::default()
        });
        let rules = rules(vec![field]);
        assert_eq!(
            apply(&rules, &data(json!({"code": "a"}))).unwrap_err()[0].detail_type,
            "string.min"
        );
        assert_eq!(
            apply(&rules, &data(json!({"code": "abcde"}))).unwrap_err()[0].detail_type,
            "string.max"
        );
        assert!(apply(&rules, &data(json!({"code": "abc"}))).is_ok());
    }

    #[test]
    fn test_email_format() {
        let rules = rules(vec![FieldDefinition::new("email", "email")]);
        assert!(apply(&rules, &data(json!({"email": "a@b.com"}))).is_ok());
        let errs = apply(&rules, &data(json!({"email": "not-an-email"}))).unwrap_err();
        assert_eq!(errs[0].detail_type, "string.email");
    }

    #[test]
    fn test_pattern() {
        let field = FieldDefinition::new("zip", "textfield").with_validate(ValidateRules {
            pattern: Some("^[0-9]{5}$".into()),
            ..ValidateRules::default()
        });
        let rules = rules(vec![field]);
        assert!(apply(&rules, &data(json!({"zip": "12345"}))).is_ok());
        let errs = apply(&rules, &data(json!({"zip": "1234a"}))).unwrap_err();
        assert_eq!(errs[0].detail_type, "string.regex.base");
        assert!(errs[0].message.contains("/^[0-9]{5}$/"));
    }

    #[test]
    fn test_step_precision() {
        let field = FieldDefinition::new("price", "number").with_validate(ValidateRules {
            step: Some("0.01".into()),
            ..ValidateRules::default()
        });
        let rules = rules(vec![field]);
        let out = apply(&rules, &data(json!({"price": 3.14}))).unwrap();
        assert_eq!(out["price"], json!(3.14));

        let errs = apply(&rules, &data(json!({"price": 3.145}))).unwrap_err();
        assert_eq!(errs[0].detail_type, "number.precision");
    }

    #[test]
    fn test_integer_step() {
        let field = FieldDefinition::new("qty", "number").with_validate(ValidateRules {
            step: Some("1".into()),
            ..ValidateRules::default()
        });
        let rules = rules(vec![field]);
        assert!(apply(&rules, &data(json!({"qty": 3}))).is_ok());
        assert_eq!(
            apply(&rules, &data(json!({"qty": 3.5}))).unwrap_err()[0].detail_type,
            "number.integer"
        );
    }

    #[test]
    fn test_numeric_string_coerced() {
        let rules = rules(vec![FieldDefinition::new("age", "number")]);
        let out = apply(&rules, &data(json!({"age": "42"}))).unwrap();
        assert_eq!(out["age"], json!(42));
        let errs = apply(&rules, &data(json!({"age": "forty"}))).unwrap_err();
        assert_eq!(errs[0].detail_type, "number.base");
    }

    #[test]
    fn test_bounds_including_zero() {
        let field = FieldDefinition::new("n", "number").with_validate(ValidateRules {
            min: Some(0.0),
            less: Some(10.0),
            ..ValidateRules::default()
        });
        let rules = rules(vec![field]);
        assert_eq!(
            apply(&rules, &data(json!({"n": -1}))).unwrap_err()[0].detail_type,
            "number.min"
        );
        assert_eq!(
            apply(&rules, &data(json!({"n": 10}))).unwrap_err()[0].detail_type,
            "number.less"
        );
        assert!(apply(&rules, &data(json!({"n": 0}))).is_ok());
    }

    #[test]
    fn test_multiple_is_sparse_array() {
        let rules = rules(vec![FieldDefinition::new("tags", "textfield").multiple()]);
        let out = apply(&rules, &data(json!({"tags": ["a", null, ""]}))).unwrap();
        assert_eq!(out["tags"], json!(["a", null, null]));

        let errs = apply(&rules, &data(json!({"tags": "a"}))).unwrap_err();
        assert_eq!(errs[0].detail_type, "array.base");
    }

    #[test]
    fn test_multiple_element_errors_carry_index() {
        let rules = rules(vec![FieldDefinition::new("nums", "number").multiple()]);
        let errs = apply(&rules, &data(json!({"nums": [1, "x"]}))).unwrap_err();
        assert_eq!(errs[0].path, "nums[1]");
    }

    #[test]
    fn test_required_multiple_needs_a_value() {
        let field = FieldDefinition::new("tags", "textfield")
            .multiple()
            .with_validate(required());
        let rules = rules(vec![field]);
        assert_eq!(
            apply(&rules, &data(json!({"tags": [""]}))).unwrap_err()[0].detail_type,
            "any.empty"
        );
        assert!(apply(&rules, &data(json!({"tags": ["x"]}))).is_ok());
    }

    #[test]
    fn test_unique_strings_lowercased() {
        let rules = rules(vec![FieldDefinition::new("email", "email").unique()]);
        let out = apply(&rules, &data(json!({"email": "A@B.COM"}))).unwrap();
        assert_eq!(out["email"], json!("a@b.com"));
    }

    #[test]
    fn test_unique_opaque_values_lowercased() {
        let rules = rules(vec![
            FieldDefinition::new("plan", "select").unique(),
            FieldDefinition::new("codes", "hidden").unique().multiple(),
        ]);
        let out = apply(&rules, &data(json!({"plan": "GOLD", "codes": ["AB", null, 3]}))).unwrap();
        assert_eq!(out["plan"], json!("gold"));
        assert_eq!(out["codes"], json!(["ab", null, 3]));
    }

    #[test]
    fn test_canonical_value_keeps_holes() {
        assert_eq!(canonical_value(&json!("AbC")), json!("abc"));
        assert_eq!(canonical_value(&json!(["A", null, 1])), json!(["a", null, 1]));
        assert_eq!(canonical_value(&json!(42)), json!(42));
    }

    #[test]
    fn test_collects_every_violation() {
        let rules = rules(vec![
            FieldDefinition::new("name", "textfield").with_validate(required()),
            FieldDefinition::new("age", "number"),
        ]);
        let errs = apply(&rules, &data(json!({"age": "old"}))).unwrap_err();
        assert_eq!(errs.len(), 2);
    }

    #[test]
    fn test_opaque_passthrough() {
        let rules = rules(vec![FieldDefinition::new("meta", "datagrid")]);
        let out = apply(&rules, &data(json!({"meta": {"a": [1, 2]}}))).unwrap();
        assert_eq!(out["meta"], json!({"a": [1, 2]}));
    }

    #[test]
    fn test_non_string_id_rejected() {
        let rules = rules(vec![]);
        let errs = apply(&rules, &data(json!({"_id": 7}))).unwrap_err();
        assert_eq!(errs[0].path, "_id");
    }
}
