//! Depth-first traversal of the component tree
//!
//! Leaves are visited exactly once, left to right. Grouping nodes are never
//! passed to the visitor; only their descendants are.

use indexmap::IndexMap;

use super::types::{Component, FieldDefinition, PATH_SEPARATOR};

/// Visits every leaf field in depth-first, left-to-right order.
pub fn each_component<'a, F>(components: &'a [Component], visit: &mut F)
where
    F: FnMut(&'a FieldDefinition),
{
    each_component_with_path(components, &mut |def, _path| visit(def));
}

/// Visits every leaf field together with its data path.
///
/// Layout groups do not nest data, so a leaf's path is its own key. Groups
/// flagged `tree` store their children's values under their own key and
/// therefore prefix the path.
pub fn each_component_with_path<'a, F>(components: &'a [Component], visit: &mut F)
where
    F: FnMut(&'a FieldDefinition, &str),
{
    walk(components, "", visit);
}

fn walk<'a, F>(components: &'a [Component], prefix: &str, visit: &mut F)
where
    F: FnMut(&'a FieldDefinition, &str),
{
    for component in components {
        match component {
            Component::Leaf(def) => {
                let key = def.field_key().unwrap_or_default();
                visit(def, &join_path(prefix, key));
            }
            Component::ColumnGroup { meta, columns } => {
                let prefix = child_prefix(prefix, meta);
                for column in columns {
                    walk(&column.components, &prefix, visit);
                }
            }
            Component::RowGroup { meta, rows } => {
                let prefix = child_prefix(prefix, meta);
                for row in rows {
                    walk(&row.components, &prefix, visit);
                }
            }
            Component::ComponentGroup { meta, components } => {
                let prefix = child_prefix(prefix, meta);
                walk(components, &prefix, visit);
            }
        }
    }
}

fn child_prefix(prefix: &str, meta: &FieldDefinition) -> String {
    match meta.field_key() {
        Some(key) if meta.is_tree() => join_path(prefix, key),
        _ => prefix.to_string(),
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}{}{}", prefix, PATH_SEPARATOR, key)
    }
}

/// Flattens the tree into a key -> leaf mapping.
///
/// Unkeyed leaves are skipped. On key collision the later leaf replaces the
/// earlier one but keeps the earlier position.
pub fn flatten_components(components: &[Component]) -> IndexMap<String, FieldDefinition> {
    let mut flattened = IndexMap::new();
    each_component(components, &mut |def| {
        if let Some(key) = def.field_key() {
            flattened.insert(key.to_string(), def.clone());
        }
    });
    flattened
}

/// Converts a component key into the key used inside a stored record,
/// inserting `data` between embedded-resource segments.
///
/// `user.name` becomes `user.data.name`.
pub fn submission_key(key: &str) -> String {
    key.split(PATH_SEPARATOR).collect::<Vec<_>>().join(".data.")
}
