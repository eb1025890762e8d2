//! Tag filters for host selection

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

use crate::inventory::error::InventoryError;
use crate::modules::field::scalar_string;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagOperator {
    Contains,
    Equals,
    NotLike,
    NotEqual,
    Exists,
    NotExists,
}

impl TagOperator {
    const ALL: [TagOperator; 6] = [
        TagOperator::Contains,
        TagOperator::Equals,
        TagOperator::NotLike,
        TagOperator::NotEqual,
        TagOperator::Exists,
        TagOperator::NotExists,
    ];

    /// Case-insensitive; `not_like` and `not like` are both accepted.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase().replace('_', " ");
        Self::ALL
            .into_iter()
            .find(|operator| operator.name() == normalized)
    }

    pub fn name(self) -> &'static str {
        match self {
            TagOperator::Contains => "contains",
            TagOperator::Equals => "equals",
            TagOperator::NotLike => "not like",
            TagOperator::NotEqual => "not equal",
            TagOperator::Exists => "exists",
            TagOperator::NotExists => "not exists",
        }
    }

    /// Operator code in `host.get` tag filters.
    pub fn code(self) -> &'static str {
        match self {
            TagOperator::Contains => "0",
            TagOperator::Equals => "1",
            TagOperator::NotLike => "2",
            TagOperator::NotEqual => "3",
            TagOperator::Exists => "4",
            TagOperator::NotExists => "5",
        }
    }
}

impl fmt::Display for TagOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How multiple tag filters combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TagsBehavior {
    /// Server side: AND across tag names, OR within one name
    #[default]
    AndOr,
    /// Server side: any filter matches
    Or,
    /// Every filter must match; evaluated locally on a preloaded host list
    And,
}

impl TagsBehavior {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "and/or" => Some(TagsBehavior::AndOr),
            "or" => Some(TagsBehavior::Or),
            "and" => Some(TagsBehavior::And),
            _ => None,
        }
    }

    /// `evaltype` for server-side evaluation; `None` when evaluated locally.
    pub fn evaltype(self) -> Option<&'static str> {
        match self {
            TagsBehavior::AndOr => Some("0"),
            TagsBehavior::Or => Some("2"),
            TagsBehavior::And => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilter {
    pub tag: String,
    pub value: String,
    pub operator: TagOperator,
}

impl TagFilter {
    pub fn new(tag: impl Into<String>, value: impl Into<String>, operator: TagOperator) -> Self {
        Self {
            tag: tag.into(),
            value: value.into(),
            operator,
        }
    }

    /// True when at least one of the host's tags satisfies the filter. Tags
    /// sharing a name are independent instances.
    pub fn matches(&self, tags: &[(String, String)]) -> bool {
        let mut same_name = tags.iter().filter(|(name, _)| *name == self.tag);
        match self.operator {
            TagOperator::Contains => same_name.any(|(_, value)| value.contains(&self.value)),
            TagOperator::Equals => same_name.any(|(_, value)| *value == self.value),
            TagOperator::NotLike => !same_name.any(|(_, value)| value.contains(&self.value)),
            TagOperator::NotEqual => !same_name.any(|(_, value)| *value == self.value),
            TagOperator::Exists => same_name.next().is_some(),
            TagOperator::NotExists => same_name.next().is_none(),
        }
    }

    pub fn to_api(&self) -> Value {
        json!({
            "tag": self.tag,
            "value": self.value,
            "operator": self.operator.code(),
        })
    }
}

/// Tag filter as written in the inventory source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTagFilter {
    pub tag: Option<String>,
    pub value: Option<Value>,
    pub operator: Option<String>,
}

/// Validate and normalize raw filters, reporting every bad entry.
pub fn parse_tag_filters(raw: &[RawTagFilter]) -> Result<Vec<TagFilter>, InventoryError> {
    let mut errors = Vec::new();
    let mut filters = Vec::with_capacity(raw.len());

    for (idx, entry) in raw.iter().enumerate() {
        let tag = entry.tag.as_deref().map(str::trim).unwrap_or_default();
        if tag.is_empty() {
            errors.push(format!("tags[{idx}]: tag is required"));
            continue;
        }

        let operator = match entry.operator.as_deref() {
            None => TagOperator::Contains,
            Some(raw_op) => match TagOperator::parse(raw_op) {
                Some(operator) => operator,
                None => {
                    let choices: Vec<&str> = TagOperator::ALL.iter().map(|op| op.name()).collect();
                    errors.push(format!(
                        "tags[{idx}]: operator must be one of: {}, got: {raw_op}",
                        choices.join(", ")
                    ));
                    continue;
                }
            },
        };

        let value = entry
            .value
            .as_ref()
            .and_then(scalar_string)
            .unwrap_or_default();
        filters.push(TagFilter::new(tag, value, operator));
    }

    if errors.is_empty() {
        Ok(filters)
    } else {
        Err(InventoryError::InvalidFilter { errors })
    }
}

pub fn parse_tags_behavior(raw: Option<&str>) -> Result<TagsBehavior, InventoryError> {
    match raw {
        None => Ok(TagsBehavior::default()),
        Some(raw) => TagsBehavior::parse(raw).ok_or_else(|| InventoryError::InvalidFilter {
            errors: vec![format!(
                "tags_behavior must be one of: and/or, or, and, got: {raw}"
            )],
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(t, v)| (t.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_operator_parsing_is_case_insensitive() {
        assert_eq!(TagOperator::parse("Not Like"), Some(TagOperator::NotLike));
        assert_eq!(TagOperator::parse("NOT_EXISTS"), Some(TagOperator::NotExists));
        assert_eq!(TagOperator::parse("equals"), Some(TagOperator::Equals));
        assert_eq!(TagOperator::parse("like"), None);
    }

    #[test]
    fn test_repeated_tag_names_are_or_ed() {
        let host = tags(&[("port", "22"), ("port", "80")]);
        assert!(TagFilter::new("port", "22", TagOperator::Equals).matches(&host));
        assert!(TagFilter::new("port", "80", TagOperator::Equals).matches(&host));
        assert!(!TagFilter::new("port", "443", TagOperator::Equals).matches(&host));
        assert!(!TagFilter::new("port", "22", TagOperator::NotEqual).matches(&host));
        assert!(TagFilter::new("port", "", TagOperator::Contains).matches(&host));
        assert!(TagFilter::new("service", "", TagOperator::NotExists).matches(&host));
    }

    #[test]
    fn test_all_filter_errors_reported() {
        let raw = vec![
            RawTagFilter {
                tag: None,
                ..Default::default()
            },
            RawTagFilter {
                tag: Some("port".into()),
                operator: Some("roughly".into()),
                ..Default::default()
            },
            RawTagFilter {
                tag: Some("port".into()),
                value: Some(Value::from(22)),
                operator: Some("Equals".into()),
            },
        ];
        match parse_tag_filters(&raw).unwrap_err() {
            InventoryError::InvalidFilter { errors } => {
                assert_eq!(errors.len(), 2);
                assert!(errors[1].contains("got: roughly"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_numeric_value_and_default_operator() {
        let raw = vec![RawTagFilter {
            tag: Some("port".into()),
            value: Some(Value::from(22)),
            operator: None,
        }];
        let parsed = parse_tag_filters(&raw).unwrap();
        assert_eq!(parsed[0], TagFilter::new("port", "22", TagOperator::Contains));
        assert_eq!(parsed[0].to_api(), json!({"tag": "port", "value": "22", "operator": "0"}));
    }

    #[test]
    fn test_behavior_evaltype() {
        assert_eq!(parse_tags_behavior(None).unwrap().evaltype(), Some("0"));
        assert_eq!(parse_tags_behavior(Some("OR")).unwrap().evaltype(), Some("2"));
        assert_eq!(parse_tags_behavior(Some("and")).unwrap().evaltype(), None);
        assert!(parse_tags_behavior(Some("xor")).is_err());
    }
}
