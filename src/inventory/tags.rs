use serde_json::{Map, Value};

use crate::modules::field::scalar_string;

/// Group a Zabbix tag list by name: repeated names collect their values in
/// order, e.g. `component: [application, health]`.
pub fn tag_to_dict_transform(tags: &Value) -> Map<String, Value> {
    let mut grouped: Map<String, Value> = Map::new();

    for tag in tags.as_array().into_iter().flatten() {
        let Some(name) = tag.get("tag").and_then(scalar_string) else {
            continue;
        };
        let value = tag.get("value").and_then(scalar_string).unwrap_or_default();

        if let Value::Array(values) = grouped
            .entry(name)
            .or_insert_with(|| Value::Array(Vec::new()))
        {
            values.push(Value::String(value));
        }
    }

    grouped
}

/// `(name, value)` pairs of a host's tag list.
pub fn tag_pairs(tags: Option<&Value>) -> Vec<(String, String)> {
    tags.and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|tag| {
            let name = tag.get("tag").and_then(scalar_string)?;
            let value = tag.get("value").and_then(scalar_string).unwrap_or_default();
            Some((name, value))
        })
        .collect()
}
