//! Tri-state task parameter: not given, explicitly cleared, or set

use serde::de::{DeserializeOwned, Deserializer, Error as DeError};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// A task option that distinguishes "not specified" from "clear this value".
///
/// A missing key or `null` deserializes to `Unset`. An empty string, list or
/// map deserializes to `Clear`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<T> {
    Unset,
    Clear,
    Value(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Unset
    }
}

impl<T> Field<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Field::Unset)
    }

    pub fn is_set(&self) -> bool {
        !self.is_unset()
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> Field<&T> {
        match self {
            Field::Unset => Field::Unset,
            Field::Clear => Field::Clear,
            Field::Value(v) => Field::Value(v),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Field<U> {
        match self {
            Field::Unset => Field::Unset,
            Field::Clear => Field::Clear,
            Field::Value(v) => Field::Value(f(v)),
        }
    }

    /// Fall back to `other` when unset; a cleared value stays cleared.
    pub fn or(self, other: Field<T>) -> Field<T> {
        match self {
            Field::Unset => other,
            set => set,
        }
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

impl<'de, T> Deserialize<'de> for Field<T>
where
    T: DeserializeOwned,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        if raw.is_null() {
            return Ok(Field::Unset);
        }
        if is_empty_value(&raw) {
            return Ok(Field::Clear);
        }
        match serde_json::from_value::<T>(raw.clone()) {
            Ok(value) => Ok(Field::Value(value)),
            // YAML writes `port: 10051` as a number; accept it for string options.
            Err(err) => match raw {
                Value::Number(n) => serde_json::from_value(Value::String(n.to_string()))
                    .map(Field::Value)
                    .map_err(|_| D::Error::custom(err)),
                _ => Err(D::Error::custom(err)),
            },
        }
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Field::Unset => serializer.serialize_none(),
            Field::Clear => serializer.serialize_str(""),
            Field::Value(v) => v.serialize(serializer),
        }
    }
}

/// Render a scalar JSON value the way the Zabbix API returns it: as a string.
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("1".to_string()),
        Value::Bool(false) => Some("0".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Params {
        #[serde(default)]
        name: Field<String>,
        #[serde(default)]
        groups: Field<Vec<String>>,
        #[serde(default)]
        port: Field<u16>,
    }

    #[test]
    fn test_tri_state() {
        let params: Params =
            serde_json::from_value(json!({"name": "", "groups": ["a"], "port": null})).unwrap();
        assert_eq!(params.name, Field::Clear);
        assert_eq!(params.groups, Field::Value(vec!["a".to_string()]));
        assert_eq!(params.port, Field::Unset);

        let params: Params = serde_json::from_value(json!({"groups": []})).unwrap();
        assert_eq!(params.name, Field::Unset);
        assert_eq!(params.groups, Field::Clear);
    }

    #[test]
    fn test_type_errors_surface() {
        let result: Result<Params, _> = serde_json::from_value(json!({"port": "http"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_numbers_accepted_for_strings() {
        #[derive(Debug, Deserialize)]
        struct Port {
            #[serde(default)]
            port: Field<String>,
        }
        let parsed: Port = serde_json::from_value(json!({"port": 10051})).unwrap();
        assert_eq!(parsed.port, Field::Value("10051".to_string()));
    }

    #[test]
    fn test_or_keeps_clear() {
        let cleared: Field<u8> = Field::Clear;
        assert_eq!(cleared.or(Field::Value(1)), Field::Clear);
        assert_eq!(Field::Unset.or(Field::Value(1)), Field::Value(1));
    }
}

