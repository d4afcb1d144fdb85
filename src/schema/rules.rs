//! Per-field rules derived from a leaf definition

use regex::Regex;

use crate::form::{FieldDefinition, FieldKind, FormError, FormResult};

/// Decimal precision allowed for a number field, inferred from `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// No step, or `step: "any"`
    Unconstrained,
    /// Step without a decimal point
    Integer,
    /// At most this many digits after the decimal point
    Decimals(usize),
}

impl Precision {
    pub fn from_step(step: Option<&str>) -> Self {
        match step {
            None => Precision::Unconstrained,
            Some(s) if s.eq_ignore_ascii_case("any") => Precision::Unconstrained,
            Some(s) => match s.split_once('.') {
                Some((_, decimals)) => Precision::Decimals(decimals.len()),
                None => Precision::Integer,
            },
        }
    }
}

/// Inclusive and exclusive bounds of a number field.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NumberBounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub greater: Option<f64>,
    pub less: Option<f64>,
}

/// Type rule chosen by the component's type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRule {
    Text {
        min_length: Option<usize>,
        max_length: Option<usize>,
    },
    Email,
    Number {
        precision: Precision,
        bounds: NumberBounds,
    },
    Opaque,
}

impl TypeRule {
    pub fn from_definition(field: &FieldDefinition) -> Self {
        let validate = field.validate.as_ref();
        match field.kind() {
            FieldKind::Text => TypeRule::Text {
                min_length: validate.and_then(|v| length_limit(v.min_length)),
                max_length: validate.and_then(|v| length_limit(v.max_length)),
            },
            FieldKind::Email => TypeRule::Email,
            FieldKind::Number => TypeRule::Number {
                precision: Precision::from_step(validate.and_then(|v| v.step.as_deref())),
                bounds: validate.map_or_else(NumberBounds::default, |v| NumberBounds {
                    min: v.min,
                    max: v.max,
                    greater: v.greater,
                    less: v.less,
                }),
            },
            FieldKind::Opaque => TypeRule::Opaque,
        }
    }

    /// Whether the rule operates on strings.
    pub fn is_textual(&self) -> bool {
        matches!(self, TypeRule::Text { .. } | TypeRule::Email)
    }
}

fn length_limit(limit: Option<f64>) -> Option<usize> {
    limit.filter(|n| *n >= 0.0).map(|n| n as usize)
}

/// The complete rule for one keyed leaf.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub key: String,
    pub type_rule: TypeRule,
    /// Value must be present and non-empty
    pub required: bool,
    /// Applied to string values only
    pub pattern: Option<Regex>,
    /// Value is a sparse array of conforming elements
    pub multiple: bool,
    /// String values are emitted lowercased
    pub canonical_case: bool,
}

impl FieldRule {
    /// Derives the rule for a keyed leaf.
    ///
    /// `required` and `pattern` only apply to persistent, directly owned
    /// fields that carry a `validate` block.
    pub fn compile(key: &str, field: &FieldDefinition) -> FormResult<Self> {
        let owned = !field.is_embedded() && field.persistent;
        let validate = field.validate.as_ref().filter(|_| owned);

        let pattern = match validate.and_then(|v| v.pattern.as_deref()) {
            Some(source) => Some(Regex::new(source).map_err(|e| FormError::InvalidPattern {
                key: key.to_string(),
                reason: e.to_string(),
            })?),
            None => None,
        };

        Ok(Self {
            key: key.to_string(),
            type_rule: TypeRule::from_definition(field),
            required: validate.map_or(false, |v| v.required),
            pattern,
            multiple: field.multiple,
            canonical_case: field.unique,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::ValidateRules;

    #[test]
    fn test_precision_from_step() {
        assert_eq!(Precision::from_step(None), Precision::Unconstrained);
        assert_eq!(Precision::from_step(Some("any")), Precision::Unconstrained);
        assert_eq!(Precision::from_step(Some("1")), Precision::Integer);
        assert_eq!(Precision::from_step(Some("0.01")), Precision::Decimals(2));
    }

    #[test]
    fn test_text_length_limits_ignore_negative() {
        let field = FieldDefinition::new("name", "textfield").with_validate(ValidateRules {
            min_length: Some(-1.0),
            max_length: Some(5.0),
            ..ValidateRules::default()
        });
        assert_eq!(
            TypeRule::from_definition(&field),
            TypeRule::Text {
                min_length: None,
                max_length: Some(5)
            }
        );
    }

    #[test]
    fn test_zero_bounds_are_kept() {
        let field = FieldDefinition::new("qty", "number").with_validate(ValidateRules {
            min: Some(0.0),
            ..ValidateRules::default()
        });
        let TypeRule::Number { bounds, .. } = TypeRule::from_definition(&field) else {
            panic!("expected number rule");
        };
        assert_eq!(bounds.min, Some(0.0));
    }

    #[test]
    fn test_required_skipped_for_embedded_keys() {
        let rules = ValidateRules {
            required: true,
            pattern: Some("^a".into()),
            ..ValidateRules::default()
        };
        let embedded = FieldDefinition::new("user.name", "textfield").with_validate(rules.clone());
        let rule = FieldRule::compile("user.name", &embedded).unwrap();
        assert!(!rule.required);
        assert!(rule.pattern.is_none());

        let owned = FieldDefinition::new("name", "textfield").with_validate(rules);
        let rule = FieldRule::compile("name", &owned).unwrap();
        assert!(rule.required);
        assert!(rule.pattern.is_some());
    }

    #[test]
    fn test_required_skipped_for_non_persistent() {
        let mut field = FieldDefinition::new("note", "textfield").with_validate(ValidateRules {
            required: true,
            ..ValidateRules::default()
        });
        field.persistent = false;
        assert!(!FieldRule::compile("note", &field).unwrap().required);
    }

    #[test]
    fn test_invalid_pattern_names_field() {
        let field = FieldDefinition::new("zip", "textfield").with_validate(ValidateRules {
            pattern: Some("(".into()),
            ..ValidateRules::default()
        });
        let err = FieldRule::compile("zip", &field).unwrap_err();
        assert!(matches!(err, FormError::InvalidPattern { ref key, .. } if key == "zip"));
    }
}
