//! Field comparison helpers shared by the resource comparators

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::modules::field::scalar_string;

/// True when `desired` differs from the existing value. The API returns
/// numbers as strings, so scalars are compared in string form.
pub fn scalar_differs(existing: Option<&Value>, desired: &Value) -> bool {
    if desired.is_null() {
        return false;
    }

    match (existing, scalar_string(desired)) {
        (None, _) => true,
        (Some(current), Some(wanted)) => scalar_string(current).as_deref() != Some(wanted.as_str()),
        (Some(current), None) => current != desired,
    }
}

/// Copy every listed scalar field whose desired value differs into `diff`.
pub fn diff_scalars(
    existing: &Value,
    desired: &Map<String, Value>,
    fields: &[&str],
    diff: &mut Map<String, Value>,
) {
    for field in fields {
        if let Some(wanted) = desired.get(*field) {
            if scalar_differs(existing.get(*field), wanted) {
                diff.insert(field.to_string(), wanted.clone());
            }
        }
    }
}

/// Collect the `id_field` values of a list of objects.
pub fn id_set(list: Option<&Value>, id_field: &str) -> BTreeSet<String> {
    list.and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get(id_field).and_then(scalar_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Compare `desired` against `existing` on the keys `desired` carries,
/// descending into nested objects the same way.
pub fn nested_differs(existing: Option<&Value>, desired: &Value) -> bool {
    match (existing, desired) {
        (Some(Value::Object(current)), Value::Object(wanted)) => wanted
            .iter()
            .any(|(key, value)| nested_differs(current.get(key), value)),
        (Some(Value::Array(current)), Value::Array(wanted)) => {
            current.len() != wanted.len()
                || current
                    .iter()
                    .zip(wanted.iter())
                    .any(|(c, w)| nested_differs(Some(c), w))
        }
        (existing, wanted) => scalar_differs(existing, wanted),
    }
}

/// Group a list of objects into `key -> sorted list of sub-objects`, so lists
/// with repeated keys compare as multisets regardless of order.
pub fn keyed_multiset(
    list: Option<&Value>,
    key_field: &str,
    sub_fields: &[&str],
    skip: impl Fn(&Value) -> bool,
) -> BTreeMap<String, Vec<Vec<String>>> {
    let mut grouped: BTreeMap<String, Vec<Vec<String>>> = BTreeMap::new();

    for item in list.and_then(Value::as_array).into_iter().flatten() {
        if skip(item) {
            continue;
        }
        let Some(key) = item.get(key_field).and_then(scalar_string) else {
            continue;
        };
        let values = sub_fields
            .iter()
            .map(|field| item.get(*field).and_then(scalar_string).unwrap_or_default())
            .collect();
        grouped.entry(key).or_default().push(values);
    }

    for values in grouped.values_mut() {
        values.sort();
    }
    grouped
}

/// Keys whose values must not show up in results or logs.
const SECRET_KEYS: &[&str] = &["tls_psk", "ipmi_password", "password"];

/// Copy of `object` with secret values masked, for reporting.
pub fn redact(object: &Map<String, Value>) -> Value {
    let masked = object
        .iter()
        .map(|(key, value)| {
            let value = if SECRET_KEYS.contains(&key.as_str()) {
                Value::String("********".to_string())
            } else {
                value.clone()
            };
            (key.clone(), value)
        })
        .collect();
    Value::Object(masked)
}

/// Existing values of the fields present in `diff`, masked for reporting.
pub fn changed_fields(existing: &Value, diff: &Map<String, Value>) -> Value {
    let before: Map<String, Value> = diff
        .keys()
        .filter_map(|key| existing.get(key).map(|value| (key.clone(), value.clone())))
        .collect();
    redact(&before)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_string_forms_match() {
        assert!(!scalar_differs(Some(&json!("7")), &json!(7)));
        assert!(!scalar_differs(Some(&json!("1")), &json!(true)));
        assert!(scalar_differs(Some(&json!("0")), &json!("1")));
        assert!(scalar_differs(None, &json!("")));
        assert!(!scalar_differs(Some(&json!("x")), &Value::Null));
    }

    #[test]
    fn test_diff_scalars_only_changed() {
        let existing = json!({"status": "0", "description": "old"});
        let mut desired = Map::new();
        desired.insert("status".to_string(), json!("0"));
        desired.insert("description".to_string(), json!("new"));

        let mut diff = Map::new();
        diff_scalars(&existing, &desired, &["status", "description"], &mut diff);
        assert_eq!(Value::Object(diff), json!({"description": "new"}));
    }

    #[test]
    fn test_nested_only_desired_keys() {
        let existing = json!({"version": "3", "bulk": "1", "community": ""});
        assert!(!nested_differs(Some(&existing), &json!({"version": "3"})));
        assert!(nested_differs(Some(&existing), &json!({"bulk": "0"})));
        assert!(nested_differs(None, &json!({"bulk": "0"})));
    }

    #[test]
    fn test_keyed_multiset_ignores_order() {
        let a = json!([
            {"tag": "port", "value": "80"},
            {"tag": "port", "value": "22"}
        ]);
        let b = json!([
            {"tag": "port", "value": "22"},
            {"tag": "port", "value": "80"}
        ]);
        assert_eq!(
            keyed_multiset(Some(&a), "tag", &["value"], |_| false),
            keyed_multiset(Some(&b), "tag", &["value"], |_| false)
        );
    }

    #[test]
    fn test_redact_masks_secrets() {
        let mut object = Map::new();
        object.insert("tls_psk".to_string(), json!("abcdef"));
        object.insert("host".to_string(), json!("web01"));
        assert_eq!(redact(&object), json!({"tls_psk": "********", "host": "web01"}));
    }
}
