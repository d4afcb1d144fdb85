//! Outgoing record filtering

use crate::form::{each_component, Form};

use super::envelope::Submission;

/// Envelope attributes never returned to callers
pub const HIDDEN_FIELDS: [&str; 3] = ["deleted", "__v", "machineName"];

/// Strips hidden envelope attributes and the values of `protected` fields.
pub fn filter_protected(mut submission: Submission, form: &Form) -> Submission {
    submission.deleted = None;
    for field in HIDDEN_FIELDS {
        submission.extra.remove(field);
    }

    if let Some(data) = submission.data.as_mut() {
        each_component(&form.components, &mut |field| {
            if let Some(key) = field.field_key().filter(|_| field.protected) {
                data.remove(key);
            }
        });
    }
    submission
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{Component, FieldDefinition};
    use serde_json::{json, Value};

    fn form() -> Form {
        let mut password = FieldDefinition::new("password", "password");
        password.protected = true;
        Form::new(
            "user",
            vec![
                Component::leaf(FieldDefinition::new("email", "email")),
                Component::group(vec![Component::leaf(password)]),
            ],
        )
    }

    #[test]
    fn test_removes_protected_and_hidden() {
        let submission: Submission = serde_json::from_value(json!({
            "_id": "s1",
            "form": "user",
            "data": {"email": "a@b.com", "password": "secret"},
            "deleted": "2024-01-01T00:00:00Z",
            "__v": 0,
            "machineName": "user:s1",
            "owner": "u1"
        }))
        .unwrap();

        let filtered = filter_protected(submission, &form());
        assert_eq!(
            serde_json::to_value(&filtered).unwrap(),
            json!({
                "_id": "s1",
                "form": "user",
                "data": {"email": "a@b.com"},
                "owner": "u1"
            })
        );
    }

    #[test]
    fn test_envelope_without_data() {
        let filtered = filter_protected(Submission::empty("user"), &form());
        assert!(filtered.data.is_none());
        assert_eq!(serde_json::to_value(&filtered).unwrap()["form"], Value::from("user"));
    }
}
