//! Field extraction from a single JSON document.
//!
//! Walks a document and records, for every structural field path, the
//! kind of value found there and the canonical string forms observed.
//! Arrays do not add index segments: the fields of all composite elements
//! are merged into one path.

use crate::models::{ExtractedFields, FieldKind, LocalField, ROOT_PATH};
use serde_json::{Map, Value};

/// Config type whose `settings` object holds arbitrarily named keys.
pub const DYNAMIC_SETTINGS_CONFIG_TYPE: &str = "default-config";

/// Parent path whose children are collapsed for that config type.
pub const DYNAMIC_SETTINGS_PATH: &str = "settings";

/// Segment that replaces every collapsed setting name.
pub const SETTING_NAME_PLACEHOLDER: &str = "{settingName}";

/// Canonical encoding of `null`.
pub const NULL_VALUE: &str = "null";

/// Extract every field of `document`.
///
/// `config_type` only selects the `settings` collapsing rule.
pub fn extract(document: &Value, config_type: &str) -> ExtractedFields {
    let mut fields = ExtractedFields::new();
    walk(document, "", config_type, &mut fields);
    fields
}

/// Canonical string form of a scalar.
///
/// Strings are taken verbatim, so `true` and `"true"` share one encoding.
pub fn canonical_value(value: &Value) -> String {
    match value {
        Value::Null => NULL_VALUE.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        // Composite values never reach here from the walker.
        other => other.to_string(),
    }
}

fn walk(value: &Value, path: &str, config_type: &str, out: &mut ExtractedFields) {
    match value {
        Value::Null => record(out, root_or(path), FieldKind::Primitive, [NULL_VALUE.to_string()]),
        Value::Array(items) => walk_array(items, path, config_type, out),
        Value::Object(map) => walk_object(map, path, config_type, out),
        scalar => record(out, root_or(path), FieldKind::Primitive, [canonical_value(scalar)]),
    }
}

fn walk_array(items: &[Value], path: &str, config_type: &str, out: &mut ExtractedFields) {
    let (composite, scalars): (Vec<&Value>, Vec<&Value>) =
        items.iter().partition(|item| is_composite(item));

    if !composite.is_empty() {
        let mut merged = ExtractedFields::new();
        for item in composite {
            walk(item, "", config_type, &mut merged);
        }
        for (inner, field) in merged {
            record(out, rekey(path, &inner), field.kind, field.values);
        }
    }

    if !scalars.is_empty() {
        let values: Vec<String> = scalars
            .into_iter()
            .filter(|item| !item.is_null())
            .map(canonical_value)
            .collect();
        record(out, root_or(path), FieldKind::Array, values);
    }
}

fn walk_object(
    map: &Map<String, Value>,
    path: &str,
    config_type: &str,
    out: &mut ExtractedFields,
) {
    for (key, child) in map {
        let child_path = child_path(path, key, config_type);
        match child {
            Value::Null => record(out, child_path, FieldKind::Primitive, [NULL_VALUE.to_string()]),
            Value::Object(_) | Value::Array(_) => walk(child, &child_path, config_type, out),
            scalar => record(out, child_path, FieldKind::Primitive, [canonical_value(scalar)]),
        }
    }
}

/// Nested arrays count as composite, like objects.
fn is_composite(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

fn child_path(parent: &str, key: &str, config_type: &str) -> String {
    if parent == DYNAMIC_SETTINGS_PATH && config_type == DYNAMIC_SETTINGS_CONFIG_TYPE {
        return format!("{}.{}", parent, SETTING_NAME_PLACEHOLDER);
    }
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

/// Re-key a path found inside a composite array element.
///
/// An element's own `[root]` entry (a nested scalar array) lands on the
/// enclosing array's path itself, so `grid: [[1, 2]]` yields `grid`
/// rather than `grid.[root]`. This departs from plain prefixing on purpose.
fn rekey(prefix: &str, inner: &str) -> String {
    match (prefix.is_empty(), inner == ROOT_PATH) {
        (true, _) => inner.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{}.{}", prefix, inner),
    }
}

fn root_or(path: &str) -> String {
    if path.is_empty() {
        ROOT_PATH.to_string()
    } else {
        path.to_string()
    }
}

/// Union `values` into `path`; the first kind recorded for a path wins.
fn record<I>(out: &mut ExtractedFields, path: String, kind: FieldKind, values: I)
where
    I: IntoIterator<Item = String>,
{
    out.entry(path)
        .or_insert_with(|| LocalField {
            kind,
            values: Default::default(),
        })
        .values
        .extend(values);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn values(fields: &ExtractedFields, path: &str) -> Vec<String> {
        fields
            .get(path)
            .map(|f| f.values.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn primitive(value: &str) -> LocalField {
        LocalField {
            kind: FieldKind::Primitive,
            values: set(&[value]),
        }
    }

    #[test]
    fn test_flat_primitives() {
        let fields = extract(&json!({"a": 1, "b": "x", "c": null}), "mod-info");

        assert_eq!(fields.len(), 3);
        assert_eq!(fields["a"], primitive("1"));
        assert_eq!(fields["b"], primitive("x"));
        assert_eq!(fields["c"], primitive("null"));
    }

    #[test]
    fn test_nested_objects_join_with_dots() {
        let fields = extract(&json!({"a": {"b": {"c": true}}}), "manifest");

        assert_eq!(fields.len(), 1);
        assert_eq!(values(&fields, "a.b.c"), vec!["true"]);
    }

    #[test]
    fn test_array_of_objects_is_flattened() {
        let doc = json!({"items": [{"id": 1}, {"id": 2, "name": "z"}]});
        let fields = extract(&doc, "manifest");

        assert_eq!(fields["items.id"].values, set(&["1", "2"]));
        assert_eq!(fields["items.name"].values, set(&["z"]));
        assert!(!fields.contains_key("items"));
    }

    #[test]
    fn test_mixed_array_emits_both_branches() {
        let fields = extract(&json!({"tags": [1, {"k": 2}, null]}), "manifest");

        assert_eq!(fields["tags"].kind, FieldKind::Array);
        assert_eq!(fields["tags"].values, set(&["1"]));
        assert_eq!(fields["tags.k"].kind, FieldKind::Primitive);
        assert_eq!(fields["tags.k"].values, set(&["2"]));
    }

    #[test]
    fn test_null_only_array_has_empty_value_set() {
        let fields = extract(&json!({"list": [null, null]}), "manifest");

        assert_eq!(fields["list"].kind, FieldKind::Array);
        assert!(fields["list"].values.is_empty());
    }

    #[test]
    fn test_empty_containers_emit_nothing() {
        assert!(extract(&json!({}), "manifest").is_empty());
        assert!(extract(&json!({"list": []}), "manifest").is_empty());
        assert!(extract(&json!({"obj": {}}), "manifest").is_empty());
    }

    #[test]
    fn test_settings_collapse_for_default_config() {
        let doc = json!({"settings": {"volume": 5, "brightness": 7}});
        let fields = extract(&doc, "default-config");

        assert_eq!(fields.len(), 1);
        assert_eq!(fields["settings.{settingName}"].values, set(&["5", "7"]));
    }

    #[test]
    fn test_settings_literal_for_other_config_types() {
        let doc = json!({"settings": {"volume": 5, "brightness": 7}});
        let fields = extract(&doc, "manifest");

        assert_eq!(fields.len(), 2);
        assert_eq!(values(&fields, "settings.volume"), vec!["5"]);
        assert_eq!(values(&fields, "settings.brightness"), vec!["7"]);
    }

    #[test]
    fn test_collapsed_settings_keep_nested_structure() {
        let doc = json!({
            "settings": {
                "volume": {"type": "slider", "default": 5},
                "theme": {"type": "select", "options": ["dark", "light"]}
            }
        });
        let fields = extract(&doc, "default-config");

        assert_eq!(
            fields["settings.{settingName}.type"].values,
            set(&["select", "slider"])
        );
        assert_eq!(values(&fields, "settings.{settingName}.default"), vec!["5"]);
        assert_eq!(fields["settings.{settingName}.options"].kind, FieldKind::Array);
    }

    #[test]
    fn test_only_top_level_settings_collapse() {
        let doc = json!({"ui": {"settings": {"volume": 5}}});
        let fields = extract(&doc, "default-config");

        assert!(fields.contains_key("ui.settings.volume"));
    }

    #[test]
    fn test_scalar_root() {
        let fields = extract(&json!(42), "manifest");
        assert_eq!(fields[ROOT_PATH], primitive("42"));

        let fields = extract(&Value::Null, "manifest");
        assert_eq!(fields[ROOT_PATH].values, set(&["null"]));
    }

    #[test]
    fn test_scalar_array_root() {
        let fields = extract(&json!(["a", "b", "a"]), "manifest");

        assert_eq!(fields[ROOT_PATH].kind, FieldKind::Array);
        assert_eq!(fields[ROOT_PATH].values, set(&["a", "b"]));
    }

    #[test]
    fn test_object_array_root_is_unprefixed() {
        let fields = extract(&json!([{"id": "x"}, {"id": "y"}]), "manifest");

        assert_eq!(fields["id"].values, set(&["x", "y"]));
        assert!(!fields.contains_key(ROOT_PATH));
    }

    #[test]
    fn test_nested_scalar_arrays_land_on_outer_path() {
        let fields = extract(&json!({"grid": [[1, 2], [3]]}), "manifest");

        assert_eq!(fields["grid"].kind, FieldKind::Array);
        assert_eq!(fields["grid"].values, set(&["1", "2", "3"]));
    }

    #[test]
    fn test_first_kind_wins_within_document() {
        // "v" is a primitive in the first element and an array in the second.
        let fields = extract(&json!({"list": [{"v": 1}, {"v": [2, 3]}]}), "manifest");

        assert_eq!(fields["list.v"].kind, FieldKind::Primitive);
        assert_eq!(fields["list.v"].values, set(&["1", "2", "3"]));
    }

    #[test]
    fn test_collapsed_settings_take_kind_of_first_key_in_document() {
        // Both keys land on one path; "zoom" comes first in the document
        // even though "alpha" sorts first.
        let doc: Value =
            serde_json::from_str(r#"{"settings": {"zoom": 1, "alpha": [2, 3]}}"#).unwrap();
        let fields = extract(&doc, "default-config");

        let setting = &fields["settings.{settingName}"];
        assert_eq!(setting.kind, FieldKind::Primitive);
        assert_eq!(setting.values, set(&["1", "2", "3"]));
    }

    #[test]
    fn test_canonical_values_collapse_types() {
        let fields = extract(&json!({"list": [true, "true", 1.5]}), "manifest");
        assert_eq!(fields["list"].values, set(&["1.5", "true"]));
    }

    #[test]
    fn test_extract_is_deterministic() {
        let doc = json!({"b": [1, {"c": 2}], "a": {"settings": {"x": 1}}});
        assert_eq!(extract(&doc, "default-config"), extract(&doc, "default-config"));
    }
}
