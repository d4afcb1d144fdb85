//! Structural validation failure details
//!
//! Each detail carries the caller-facing triple `{message, path, type}`.
//! Messages name the offending key in double quotes; `type` is a stable
//! dotted rule name such as `string.min` or `any.required`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sandbox::ScriptValue;

/// One rule violation at one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Human-readable message
    pub message: String,
    /// Field key, with `[i]` suffixes for array elements
    pub path: String,
    /// Rule name, e.g. `number.precision`
    #[serde(rename = "type")]
    pub detail_type: String,
}

impl ErrorDetail {
    pub fn new(
        message: impl Into<String>,
        path: impl Into<String>,
        detail_type: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            path: path.into(),
            detail_type: detail_type.into(),
        }
    }

    pub fn required(path: &str) -> Self {
        Self::new(format!("\"{}\" is required", path), path, "any.required")
    }

    pub fn empty(path: &str) -> Self {
        Self::new(
            format!("\"{}\" is not allowed to be empty", path),
            path,
            "any.empty",
        )
    }

    pub fn not_a_string(path: &str) -> Self {
        Self::new(format!("\"{}\" must be a string", path), path, "string.base")
    }

    pub fn not_a_number(path: &str) -> Self {
        Self::new(format!("\"{}\" must be a number", path), path, "number.base")
    }

    pub fn not_an_array(path: &str) -> Self {
        Self::new(format!("\"{}\" must be an array", path), path, "array.base")
    }

    pub fn too_short(path: &str, limit: usize) -> Self {
        Self::new(
            format!("\"{}\" length must be at least {} characters long", path, limit),
            path,
            "string.min",
        )
    }

    pub fn too_long(path: &str, limit: usize) -> Self {
        Self::new(
            format!(
                "\"{}\" length must be less than or equal to {} characters long",
                path, limit
            ),
            path,
            "string.max",
        )
    }

    pub fn invalid_email(path: &str) -> Self {
        Self::new(
            format!("\"{}\" must be a valid email", path),
            path,
            "string.email",
        )
    }

    pub fn pattern_mismatch(path: &str, value: &str, pattern: &str) -> Self {
        Self::new(
            format!(
                "\"{}\" with value \"{}\" fails to match the required pattern: /{}/",
                path, value, pattern
            ),
            path,
            "string.regex.base",
        )
    }

    pub fn not_an_integer(path: &str) -> Self {
        Self::new(format!("\"{}\" must be an integer", path), path, "number.integer")
    }

    pub fn too_precise(path: &str, decimals: usize) -> Self {
        Self::new(
            format!("\"{}\" must have no more than {} decimal places", path, decimals),
            path,
            "number.precision",
        )
    }

    /// A numeric bound violation; `rule` is one of min, max, greater, less.
    pub fn out_of_range(path: &str, rule: &str, limit: f64) -> Self {
        let phrase = match rule {
            "min" => "be larger than or equal to",
            "max" => "be less than or equal to",
            "greater" => "be greater than",
            _ => "be less than",
        };
        Self::new(
            format!(
                "\"{}\" must {} {}",
                path,
                phrase,
                ScriptValue::Number(limit).to_display_string()
            ),
            path,
            format!("number.{}", rule),
        )
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} at '{}')", self.message, self.detail_type, self.path)
    }
}

/// Result of structural validation: the canonical record or every violation
pub type StructuralResult<T> = Result<T, Vec<ErrorDetail>>;
