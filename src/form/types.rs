//! Form definition tree
//!
//! A form is a forest of components. Grouping nodes carry exactly one child
//! collection (`columns[].components`, `rows[].components` or `components`);
//! every other node is a leaf field that contributes to validation.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use super::errors::{FormError, FormResult};

/// Separator marking keys that address a field of an embedded resource.
pub const PATH_SEPARATOR: char = '.';

/// Validation behaviour derived from a component's `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// text, textarea and phone inputs
    Text,
    /// email input
    Email,
    /// numeric input
    Number,
    /// anything else; passed through unconstrained
    Opaque,
}

impl FieldKind {
    /// Maps a component type tag to its validation behaviour.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "text" | "textfield" | "textarea" | "phone" | "phonenumber" | "phoneNumber" => {
                FieldKind::Text
            }
            "email" => FieldKind::Email,
            "number" => FieldKind::Number,
            _ => FieldKind::Opaque,
        }
    }
}

/// The `validate` block of a component.
///
/// Form authors frequently leave blank strings in numeric slots, so numeric
/// constraints are read leniently: anything that is not a JSON number is
/// treated as unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRules {
    #[serde(default)]
    pub required: bool,
    #[serde(default, deserialize_with = "non_empty_string", skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub greater: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub less: Option<f64>,
    #[serde(default, deserialize_with = "lenient_step", skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string", skip_serializing_if = "Option::is_none")]
    pub custom: Option<String>,
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()))
}

fn lenient_step<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    })
}

fn default_persistent() -> bool {
    true
}

/// Attributes of a single node in the form tree.
///
/// Grouping nodes reuse this struct for their own attributes (type, key,
/// label); their children live in the owning [`Component`] variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default = "default_persistent")]
    pub persistent: bool,
    #[serde(default)]
    pub protected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate: Option<ValidateRules>,
    /// Remaining author-defined attributes, visible to custom scripts.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldDefinition {
    /// Creates a persistent field with the given key and type tag.
    pub fn new(key: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            field_type: field_type.into(),
            label: None,
            unique: false,
            multiple: false,
            persistent: true,
            protected: false,
            validate: None,
            extra: Map::new(),
        }
    }

    /// Creates an unkeyed layout node of the given type.
    pub fn layout(field_type: impl Into<String>) -> Self {
        Self {
            key: None,
            ..Self::new("", field_type)
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn with_validate(mut self, rules: ValidateRules) -> Self {
        self.validate = Some(rules);
        self
    }

    /// Returns the key when present and non-empty.
    pub fn field_key(&self) -> Option<&str> {
        self.key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn kind(&self) -> FieldKind {
        FieldKind::from_tag(&self.field_type)
    }

    /// True when the key addresses a field of an embedded resource.
    pub fn is_embedded(&self) -> bool {
        self.field_key()
            .map_or(false, |k| k.contains(PATH_SEPARATOR))
    }

    /// Human label used in messages, falling back to the capitalised key.
    pub fn display_label(&self) -> String {
        if let Some(label) = self.label.as_deref().filter(|l| !l.is_empty()) {
            return label.to_string();
        }
        let key = self.field_key().unwrap_or_default();
        let mut chars = key.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// True when this node's key prefixes its descendants' data paths.
    pub fn is_tree(&self) -> bool {
        matches!(self.extra.get("tree"), Some(Value::Bool(true)))
    }
}

/// One column or row cell of a grouping node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Cell {
    pub fn new(components: Vec<Component>) -> Self {
        Self {
            components,
            extra: Map::new(),
        }
    }
}

/// A node of the form tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    /// A field that contributes directly to validation
    Leaf(FieldDefinition),
    /// `columns[].components`
    ColumnGroup {
        meta: FieldDefinition,
        columns: Vec<Cell>,
    },
    /// `rows[].components`
    RowGroup { meta: FieldDefinition, rows: Vec<Cell> },
    /// `components`
    ComponentGroup {
        meta: FieldDefinition,
        components: Vec<Component>,
    },
}

impl Component {
    pub fn leaf(def: FieldDefinition) -> Self {
        Component::Leaf(def)
    }

    pub fn columns(columns: Vec<Vec<Component>>) -> Self {
        Component::ColumnGroup {
            meta: FieldDefinition::layout("columns"),
            columns: columns.into_iter().map(Cell::new).collect(),
        }
    }

    pub fn rows(rows: Vec<Vec<Component>>) -> Self {
        Component::RowGroup {
            meta: FieldDefinition::layout("table"),
            rows: rows.into_iter().map(Cell::new).collect(),
        }
    }

    pub fn group(components: Vec<Component>) -> Self {
        Component::ComponentGroup {
            meta: FieldDefinition::layout("fieldset"),
            components,
        }
    }

    /// The node's own attributes.
    pub fn definition(&self) -> &FieldDefinition {
        match self {
            Component::Leaf(def) => def,
            Component::ColumnGroup { meta, .. }
            | Component::RowGroup { meta, .. }
            | Component::ComponentGroup { meta, .. } => meta,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Component::Leaf(_))
    }
}

const CHILD_COLLECTIONS: [&str; 3] = ["columns", "rows", "components"];

/// Removes a populated child array from a raw node.
fn take_children(obj: &mut Map<String, Value>, name: &str) -> Option<Value> {
    match obj.get(name) {
        Some(Value::Array(items)) if !items.is_empty() => obj.remove(name),
        _ => None,
    }
}

impl TryFrom<Value> for Component {
    type Error = FormError;

    fn try_from(value: Value) -> FormResult<Self> {
        let Value::Object(mut obj) = value else {
            return Err(FormError::MalformedComponent(
                "component must be a JSON object".into(),
            ));
        };

        let populated = CHILD_COLLECTIONS
            .iter()
            .filter(|name| matches!(obj.get(**name), Some(Value::Array(a)) if !a.is_empty()))
            .count();
        if populated > 1 {
            let key = obj.get("key").and_then(Value::as_str).unwrap_or("<unkeyed>");
            return Err(FormError::MalformedComponent(format!(
                "component '{}' declares more than one child collection",
                key
            )));
        }

        let columns = take_children(&mut obj, "columns");
        let rows = take_children(&mut obj, "rows");
        let components = take_children(&mut obj, "components");

        let meta: FieldDefinition = serde_json::from_value(Value::Object(obj))
            .map_err(|e| FormError::MalformedComponent(e.to_string()))?;

        let malformed = |e: serde_json::Error| FormError::MalformedComponent(e.to_string());
        Ok(match (columns, rows, components) {
            (Some(columns), _, _) => Component::ColumnGroup {
                meta,
                columns: serde_json::from_value(columns).map_err(malformed)?,
            },
            (_, Some(rows), _) => Component::RowGroup {
                meta,
                rows: serde_json::from_value(rows).map_err(malformed)?,
            },
            (_, _, Some(components)) => Component::ComponentGroup {
                meta,
                components: serde_json::from_value(components).map_err(malformed)?,
            },
            _ => Component::Leaf(meta),
        })
    }
}

impl<'de> Deserialize<'de> for Component {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Component::try_from(value).map_err(de::Error::custom)
    }
}

#[derive(Serialize)]
struct GroupRepr<'a> {
    #[serde(flatten)]
    meta: &'a FieldDefinition,
    #[serde(skip_serializing_if = "Option::is_none")]
    columns: Option<&'a [Cell]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<&'a [Cell]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    components: Option<&'a [Component]>,
}

impl Serialize for Component {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let repr = match self {
            Component::Leaf(def) => return def.serialize(serializer),
            Component::ColumnGroup { meta, columns } => GroupRepr {
                meta,
                columns: Some(columns),
                rows: None,
                components: None,
            },
            Component::RowGroup { meta, rows } => GroupRepr {
                meta,
                columns: None,
                rows: Some(rows),
                components: None,
            },
            Component::ComponentGroup { meta, components } => GroupRepr {
                meta,
                columns: None,
                rows: None,
                components: Some(components),
            },
        };
        repr.serialize(serializer)
    }
}

/// A form: identity, revision and its component forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    #[serde(rename = "_id")]
    pub id: String,
    /// Bumped whenever the definition changes
    #[serde(default)]
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub components: Vec<Component>,
}

impl Form {
    pub fn new(id: impl Into<String>, components: Vec<Component>) -> Self {
        Self {
            id: id.into(),
            version: 0,
            title: None,
            components,
        }
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_leaf_parses_with_defaults() {
        let c: Component = serde_json::from_value(json!({
            "key": "email",
            "type": "email",
            "unique": true,
            "validate": {"required": true}
        }))
        .unwrap();

        let Component::Leaf(def) = c else {
            panic!("expected leaf");
        };
        assert_eq!(def.field_key(), Some("email"));
        assert!(def.unique);
        assert!(def.persistent);
        assert!(def.validate.unwrap().required);
    }

    #[test]
    fn test_empty_child_collection_is_leaf() {
        let c: Component =
            serde_json::from_value(json!({"key": "x", "type": "textfield", "components": []}))
                .unwrap();
        assert!(c.is_leaf());
    }

    #[test]
    fn test_columns_become_column_group() {
        let c: Component = serde_json::from_value(json!({
            "type": "columns",
            "key": "columns1",
            "columns": [
                {"width": 6, "components": [{"key": "tag", "type": "textfield", "unique": true}]},
                {"components": []}
            ]
        }))
        .unwrap();

        match c {
            Component::ColumnGroup { meta, columns } => {
                assert_eq!(meta.field_key(), Some("columns1"));
                assert_eq!(columns.len(), 2);
                assert_eq!(columns[0].extra.get("width"), Some(&json!(6)));
                assert!(columns[0].components[0].definition().unique);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_two_child_collections_rejected() {
        let result: Result<Component, _> = serde_json::from_value(json!({
            "key": "bad",
            "columns": [{"components": [{"key": "a"}]}],
            "components": [{"key": "b"}]
        }));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("more than one child collection"));
    }

    #[test]
    fn test_lenient_validate_block() {
        let rules: ValidateRules = serde_json::from_value(json!({
            "required": false,
            "minLength": "",
            "maxLength": 10,
            "pattern": "",
            "step": 0.01,
            "custom": ""
        }))
        .unwrap();

        assert_eq!(rules.min_length, None);
        assert_eq!(rules.max_length, Some(10.0));
        assert_eq!(rules.pattern, None);
        assert_eq!(rules.step.as_deref(), Some("0.01"));
        assert_eq!(rules.custom, None);
    }

    #[test]
    fn test_group_serializes_back_to_tree_shape() {
        let form = Form::new(
            "f1",
            vec![Component::group(vec![Component::leaf(
                FieldDefinition::new("name", "textfield").unique(),
            )])],
        );

        let value = serde_json::to_value(&form).unwrap();
        assert_eq!(value["_id"], "f1");
        assert_eq!(value["components"][0]["type"], "fieldset");
        assert_eq!(value["components"][0]["components"][0]["key"], "name");
        assert_eq!(value["components"][0]["components"][0]["unique"], true);

        let back: Form = serde_json::from_value(value).unwrap();
        assert_eq!(back, form);
    }

    #[test]
    fn test_display_label_falls_back_to_key() {
        let def = FieldDefinition::new("email", "email");
        assert_eq!(def.display_label(), "Email");
        assert_eq!(def.with_label("E-mail address").display_label(), "E-mail address");
    }

    #[test]
    fn test_field_kinds() {
        assert_eq!(FieldKind::from_tag("textfield"), FieldKind::Text);
        assert_eq!(FieldKind::from_tag("phoneNumber"), FieldKind::Text);
        assert_eq!(FieldKind::from_tag("email"), FieldKind::Email);
        assert_eq!(FieldKind::from_tag("number"), FieldKind::Number);
        assert_eq!(FieldKind::from_tag("signature"), FieldKind::Opaque);
    }
}
