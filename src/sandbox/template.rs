//! `{{ key }}` substitution applied to a custom expression before parsing

use serde_json::Value;

use super::errors::{SandboxError, SandboxResult};
use super::value::ScriptValue;
use crate::store::RecordData;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Replaces the single `{{ key }}` token in `source` with the record value
/// for `key`, rendered as script text.
///
/// Keys missing from `data` leave the token untouched so the parser reports
/// it. More than one token is rejected.
pub fn substitute(source: &str, data: &RecordData) -> SandboxResult<String> {
    let Some(start) = source.find(OPEN) else {
        return Ok(source.to_string());
    };
    let Some(close) = source[start + OPEN.len()..].find(CLOSE) else {
        return Ok(source.to_string());
    };
    let end = start + OPEN.len() + close + CLOSE.len();

    if source[end..].contains(OPEN) {
        return Err(SandboxError::UnsupportedTemplate(
            "only one {{ }} substitution is allowed per expression".into(),
        ));
    }

    let key = source[start + OPEN.len()..end - CLOSE.len()].trim();
    let Some(value) = data.get(key) else {
        return Ok(source.to_string());
    };

    let mut out = String::with_capacity(source.len());
    out.push_str(&source[..start]);
    out.push_str(&render(value));
    out.push_str(&source[end..]);
    Ok(out)
}

fn render(value: &Value) -> String {
    ScriptValue::from_json(value).to_display_string()
}
