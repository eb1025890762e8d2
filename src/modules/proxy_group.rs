//! Proxy group module - manages Zabbix 7.0+ proxy groups

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::api::ZabbixApi;
use crate::modules::compare::{changed_fields, diff_scalars};
use crate::modules::error::{ReconcileError, ValidationErrors};
use crate::modules::field::{scalar_string, Field};
use crate::modules::interface::{ModuleArgs, ModuleContext, ModuleResult, State, ZabbixModule};
use crate::version::ApiCapabilities;

const DEFAULT_FAILOVER_DELAY: &str = "1m";
const DEFAULT_MIN_ONLINE: &str = "1";
const PROXY_GROUP_SCALARS: &[&str] = &["name", "failover_delay", "min_online", "description"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyGroupParams {
    pub state: State,
    pub name: String,
    pub failover_delay: Field<String>,
    pub min_online: Field<String>,
    pub description: Field<String>,
}

impl ProxyGroupParams {
    pub fn validate(&self, capabilities: Option<&ApiCapabilities>) -> Result<(), ReconcileError> {
        let mut errors = ValidationErrors::new();
        if self.name.trim().is_empty() {
            errors.push("name is required");
        }
        if let Some(capabilities) = capabilities {
            if !capabilities.supports_proxy_groups {
                errors.push(format!(
                    "proxy groups are not supported by Zabbix {}",
                    capabilities.version
                ));
            }
        }
        errors.into_result()
    }
}

/// Desired proxy group. Defaults apply only when creating.
pub fn generate_proxy_group(
    capabilities: &ApiCapabilities,
    params: &ProxyGroupParams,
    creating: bool,
) -> Result<Map<String, Value>, ReconcileError> {
    params.validate(Some(capabilities))?;

    let mut desired = Map::new();
    desired.insert("name".to_string(), json!(params.name));

    for (key, field, default) in [
        ("failover_delay", &params.failover_delay, DEFAULT_FAILOVER_DELAY),
        ("min_online", &params.min_online, DEFAULT_MIN_ONLINE),
    ] {
        match field {
            Field::Value(value) => {
                desired.insert(key.to_string(), json!(value));
            }
            Field::Unset if !creating => {}
            Field::Clear | Field::Unset => {
                desired.insert(key.to_string(), json!(default));
            }
        }
    }

    match &params.description {
        Field::Value(description) => {
            desired.insert("description".to_string(), json!(description));
        }
        Field::Clear => {
            desired.insert("description".to_string(), json!(""));
        }
        Field::Unset => {}
    }

    Ok(desired)
}

pub fn compare_proxy_group(existing: &Value, desired: &Map<String, Value>) -> Map<String, Value> {
    let mut diff = Map::new();
    diff_scalars(existing, desired, PROXY_GROUP_SCALARS, &mut diff);
    diff
}

pub async fn fetch_proxy_group(
    api: &dyn ZabbixApi,
    name: &str,
) -> Result<Option<Value>, ReconcileError> {
    let found = api
        .call(
            "proxygroup.get",
            json!({"output": "extend", "filter": {"name": [name]}}),
        )
        .await?;
    Ok(found.as_array().and_then(|groups| groups.first()).cloned())
}

#[derive(Debug, Default)]
pub struct ProxyGroupModule;

impl ProxyGroupModule {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ZabbixModule for ProxyGroupModule {
    fn name(&self) -> &'static str {
        "proxy_group"
    }

    fn validate_args(&self, args: &ModuleArgs) -> Result<(), ReconcileError> {
        args.parse::<ProxyGroupParams>()?.validate(None)
    }

    async fn execute(
        &self,
        args: &ModuleArgs,
        context: &ModuleContext<'_>,
    ) -> Result<ModuleResult, ReconcileError> {
        let params: ProxyGroupParams = args.parse()?;
        params.validate(Some(context.capabilities))?;
        let name = params.name.as_str();
        let existing = fetch_proxy_group(context.api, name).await?;

        match (params.state, existing) {
            (State::Absent, None) => Ok(ModuleResult::unchanged(format!(
                "Proxy group {name} does not exist"
            ))),
            (State::Absent, Some(group)) => {
                let id = group_id(&group)?;
                if context.check_mode {
                    return Ok(ModuleResult::changed(
                        format!("Proxy group {name} would be deleted"),
                        Value::Null,
                    ));
                }
                let deleted = context.api.call("proxygroup.delete", json!([id])).await?;
                info!("Deleted proxy group {}", name);
                Ok(ModuleResult::changed(format!("Proxy group {name} deleted"), deleted))
            }
            (State::Present, None) => {
                let desired = generate_proxy_group(context.capabilities, &params, true)?;
                if context.check_mode {
                    return Ok(ModuleResult::changed(
                        format!("Proxy group {name} would be created"),
                        Value::Object(desired),
                    ));
                }
                let created = context
                    .api
                    .call("proxygroup.create", Value::Object(desired))
                    .await?;
                info!("Created proxy group {}", name);
                Ok(ModuleResult::changed(format!("Proxy group {name} created"), created))
            }
            (State::Present, Some(group)) => {
                let desired = generate_proxy_group(context.capabilities, &params, false)?;
                let mut diff = compare_proxy_group(&group, &desired);
                if diff.is_empty() {
                    return Ok(ModuleResult::unchanged(format!(
                        "Proxy group {name} is up to date"
                    )));
                }
                let before = changed_fields(&group, &diff);
                let after = Value::Object(diff.clone());
                if context.check_mode {
                    return Ok(ModuleResult::changed(
                        format!("Proxy group {name} would be updated"),
                        Value::Null,
                    )
                    .with_diff(before, after));
                }
                diff.insert("proxy_groupid".to_string(), Value::String(group_id(&group)?));
                let updated = context
                    .api
                    .call("proxygroup.update", Value::Object(diff))
                    .await?;
                info!("Updated proxy group {}", name);
                Ok(ModuleResult::changed(format!("Proxy group {name} updated"), updated)
                    .with_diff(before, after))
            }
        }
    }
}

fn group_id(group: &Value) -> Result<String, ReconcileError> {
    group
        .get("proxy_groupid")
        .and_then(scalar_string)
        .ok_or_else(|| ReconcileError::RemoteApi {
            message: "proxygroup.get returned a group without proxy_groupid".to_string(),
        })
}
