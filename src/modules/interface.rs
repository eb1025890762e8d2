//! Module interface traits and types

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::ZabbixApi;
use crate::modules::error::ReconcileError;
use crate::version::ApiCapabilities;

/// Unified interface for all Zabbix resource modules
#[async_trait]
pub trait ZabbixModule: Send + Sync {
    /// Module name (e.g., "host", "proxy")
    fn name(&self) -> &'static str;

    /// Validate module arguments before any remote call
    fn validate_args(&self, args: &ModuleArgs) -> Result<(), ReconcileError>;

    /// Bring the remote resource to the requested state
    async fn execute(
        &self,
        args: &ModuleArgs,
        context: &ModuleContext<'_>,
    ) -> Result<ModuleResult, ReconcileError>;
}

/// Module execution arguments as given in the task file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleArgs {
    pub args: Map<String, Value>,
}

impl ModuleArgs {
    pub fn new(args: Map<String, Value>) -> Self {
        Self { args }
    }

    /// Decode into a module's typed parameter struct.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ReconcileError> {
        Ok(serde_json::from_value(Value::Object(self.args.clone()))?)
    }
}

impl From<Value> for ModuleArgs {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(args) => Self { args },
            _ => Self::default(),
        }
    }
}

/// Everything a module needs to talk to Zabbix
pub struct ModuleContext<'a> {
    pub api: &'a dyn ZabbixApi,
    pub capabilities: &'a ApiCapabilities,
    pub check_mode: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    #[default]
    Present,
    Absent,
}

/// Module execution result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleResult {
    pub changed: bool,
    pub failed: bool,
    pub msg: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<Diff>,
}

impl ModuleResult {
    pub fn unchanged(msg: impl Into<String>) -> Self {
        Self {
            changed: false,
            msg: Some(msg.into()),
            ..Default::default()
        }
    }

    pub fn changed(msg: impl Into<String>, result: Value) -> Self {
        Self {
            changed: true,
            msg: Some(msg.into()),
            result,
            ..Default::default()
        }
    }

    pub fn with_diff(mut self, before: Value, after: Value) -> Self {
        self.diff = Some(Diff { before, after });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diff {
    pub before: Value,
    pub after: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default)]
        state: State,
        name: String,
    }

    #[test]
    fn test_parse_args() {
        let args = ModuleArgs::from(json!({"name": "web01"}));
        let sample: Sample = args.parse().unwrap();
        assert_eq!(sample.state, State::Present);
        assert_eq!(sample.name, "web01");

        let args = ModuleArgs::from(json!({"state": "gone", "name": "web01"}));
        assert!(matches!(
            args.parse::<Sample>(),
            Err(ReconcileError::Validation { .. })
        ));
    }

    #[test]
    fn test_result_serialization_skips_empty() {
        let encoded = serde_json::to_value(ModuleResult::unchanged("nothing to do")).unwrap();
        assert_eq!(
            encoded,
            json!({"changed": false, "failed": false, "msg": "nothing to do"})
        );
    }

    #[test]
    fn test_changed_result_fields() {
        let result = ModuleResult::changed("Host web01 created", json!({"hostids": ["1"]}))
            .with_diff(json!({}), json!({"host": "web01"}));
        let encoded = serde_json::to_value(result).unwrap();
        let keys: Vec<&str> = encoded.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["changed", "diff", "failed", "msg", "result"]);
    }
}
