//! Scope-based begin/complete logging
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` or `{name}_FAILED` when closed
//! - Warns with `{name}_INCOMPLETE` when dropped without being closed

use std::time::Instant;

use super::logger::Logger;

/// A scope that logs its own start and end.
///
/// ```ignore
/// let scope = ObservationScope::new("NORMALIZE");
/// // ... do work ...
/// scope.complete_with_fields(&[("forms", "3")]);
/// ```
pub struct ObservationScope {
    name: String,
    fields: Vec<(String, String)>,
    started: Instant,
    closed: bool,
}

impl ObservationScope {
    pub fn new(name: &str) -> Self {
        Self::with_fields(name, &[])
    }

    pub fn with_fields(name: &str, fields: &[(&str, &str)]) -> Self {
        Logger::info(&format!("{}_BEGIN", name), fields);
        Self {
            name: name.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            started: Instant::now(),
            closed: false,
        }
    }

    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    /// Logs `{name}_COMPLETE` with the opening fields, the extra fields and
    /// the elapsed time.
    pub fn complete_with_fields(mut self, extra: &[(&str, &str)]) {
        self.closed = true;
        let elapsed = self.started.elapsed().as_millis().to_string();
        let mut all = self.field_refs();
        all.extend(extra.iter().copied());
        all.push(("duration_ms", elapsed.as_str()));
        Logger::info(&format!("{}_COMPLETE", self.name), &all);
    }

    pub fn fail(mut self, reason: &str) {
        self.closed = true;
        let mut all = self.field_refs();
        all.push(("reason", reason));
        Logger::error(&format!("{}_FAILED", self.name), &all);
    }

    fn field_refs(&self) -> Vec<(&str, &str)> {
        self.fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.closed {
            Logger::warn(
                &format!("{}_INCOMPLETE", self.name),
                &[("reason", "scope dropped without completion")],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_closes_scope() {
        let scope = ObservationScope::with_fields("TEST", &[("form", "f1")]);
        assert!(!scope.closed);
        scope.complete_with_fields(&[("records", "2")]);
    }

    #[test]
    fn test_fail_closes_scope() {
        let scope = ObservationScope::new("TEST");
        scope.fail("boom");
    }
}
