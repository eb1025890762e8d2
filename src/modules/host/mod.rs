//! Host module - manages Zabbix hosts

pub mod compare;
pub mod generator;
pub mod interfaces;
pub mod params;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::api::ZabbixApi;
use crate::modules::compare::{changed_fields, redact};
use crate::modules::error::ReconcileError;
use crate::modules::field::{scalar_string, Field};
use crate::modules::interface::{ModuleArgs, ModuleContext, ModuleResult, State, ZabbixModule};
use crate::version::ApiCapabilities;

pub use compare::compare_host;
pub use generator::generate_host;
pub use params::HostParams;

/// Host module - creates, updates and deletes hosts
#[derive(Debug, Default)]
pub struct HostModule;

impl HostModule {
    pub fn new() -> Self {
        Self
    }
}

/// Fetch a host by technical name with everything the comparator reads.
pub async fn fetch_host(
    api: &dyn ZabbixApi,
    capabilities: &ApiCapabilities,
    host: &str,
) -> Result<Option<Value>, ReconcileError> {
    let mut params = Map::new();
    params.insert("output".to_string(), json!("extend"));
    params.insert("filter".to_string(), json!({ "host": [host] }));
    params.insert(
        capabilities.host_groups_select.to_string(),
        json!(["groupid", "name"]),
    );
    params.insert("selectParentTemplates".to_string(), json!(["templateid", "name"]));
    for select in ["selectTags", "selectMacros", "selectInterfaces", "selectInventory"] {
        params.insert(select.to_string(), json!("extend"));
    }

    let found = api.call("host.get", Value::Object(params)).await?;
    Ok(found.as_array().and_then(|hosts| hosts.first()).cloned())
}

#[async_trait]
impl ZabbixModule for HostModule {
    fn name(&self) -> &'static str {
        "host"
    }

    fn validate_args(&self, args: &ModuleArgs) -> Result<(), ReconcileError> {
        args.parse::<HostParams>()?.validate(None)
    }

    async fn execute(
        &self,
        args: &ModuleArgs,
        context: &ModuleContext<'_>,
    ) -> Result<ModuleResult, ReconcileError> {
        let params: HostParams = args.parse()?;
        params.validate(Some(context.capabilities))?;
        let name = params.host.as_str();

        let existing = fetch_host(context.api, context.capabilities, name).await?;
        debug!("Host {} exists: {}", name, existing.is_some());

        match (params.state, existing) {
            (State::Absent, None) => Ok(ModuleResult::unchanged(format!(
                "Host {name} does not exist"
            ))),
            (State::Absent, Some(host)) => {
                let id = host_id(&host)?;
                if context.check_mode {
                    return Ok(ModuleResult::changed(
                        format!("Host {name} would be deleted"),
                        Value::Null,
                    ));
                }
                context.api.call("host.delete", json!([id])).await?;
                info!("Deleted host {}", name);
                Ok(
                    ModuleResult::changed(format!("Host {name} deleted"), json!({ "hostids": [id] }))
                        .with_diff(json!({ "host": name }), json!({})),
                )
            }
            (State::Present, None) => {
                if !matches!(params.hostgroups, Field::Value(_)) {
                    return Err(ReconcileError::validation(format!(
                        "hostgroups is required to create host {name}"
                    )));
                }
                let desired =
                    generate_host(context.api, context.capabilities, &params, None).await?;
                if context.check_mode {
                    return Ok(ModuleResult::changed(
                        format!("Host {name} would be created"),
                        redact(&desired),
                    ));
                }
                let created = context
                    .api
                    .call("host.create", Value::Object(desired.clone()))
                    .await?;
                info!("Created host {}", name);
                Ok(ModuleResult::changed(format!("Host {name} created"), created)
                    .with_diff(json!({}), redact(&desired)))
            }
            (State::Present, Some(host)) => {
                let desired =
                    generate_host(context.api, context.capabilities, &params, Some(&host))
                        .await?;
                let mut diff = compare_host(&host, &desired, context.capabilities)?;
                if diff.is_empty() {
                    return Ok(ModuleResult::unchanged(format!("Host {name} is up to date")));
                }

                let before = changed_fields(&host, &diff);
                let after = redact(&diff);
                if context.check_mode {
                    return Ok(ModuleResult::changed(
                        format!("Host {name} would be updated"),
                        Value::Null,
                    )
                    .with_diff(before, after));
                }

                diff.insert("hostid".to_string(), Value::String(host_id(&host)?));
                let updated = context.api.call("host.update", Value::Object(diff)).await?;
                info!("Updated host {}", name);
                Ok(ModuleResult::changed(format!("Host {name} updated"), updated)
                    .with_diff(before, after))
            }
        }
    }
}

fn host_id(host: &Value) -> Result<String, ReconcileError> {
    host.get("hostid")
        .and_then(scalar_string)
        .ok_or_else(|| ReconcileError::RemoteApi {
            message: "host.get returned a host without hostid".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApi;

    fn caps() -> ApiCapabilities {
        ApiCapabilities::for_version(&"7.0".parse().unwrap())
    }

    fn args(value: Value) -> ModuleArgs {
        ModuleArgs::from(value)
    }

    fn existing() -> Value {
        json!([{
            "hostid": "10084",
            "host": "web01",
            "name": "web01",
            "status": "0",
            "hostgroups": [{"groupid": "2", "name": "Linux servers"}],
            "parentTemplates": [],
            "tags": [],
            "macros": [],
            "interfaces": [],
            "inventory": []
        }])
    }

    #[tokio::test]
    async fn test_create_requires_hostgroups() {
        let api = MockApi::new().with("host.get", json!([]));
        let caps = caps();
        let context = ModuleContext { api: &api, capabilities: &caps, check_mode: false };

        let err = HostModule::new()
            .execute(&args(json!({"host": "web01"})), &context)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("hostgroups is required"));
        assert_eq!(api.methods(), vec!["host.get"]);
    }

    #[tokio::test]
    async fn test_create_host() {
        let api = MockApi::new()
            .with("host.get", json!([]))
            .with("hostgroup.get", json!([{"groupid": "2", "name": "Linux servers"}]))
            .with("host.create", json!({"hostids": ["10085"]}));
        let caps = caps();
        let context = ModuleContext { api: &api, capabilities: &caps, check_mode: false };

        let result = HostModule::new()
            .execute(&args(json!({"host": "web01", "hostgroups": ["Linux servers"]})), &context)
            .await
            .unwrap();

        assert!(result.changed);
        assert_eq!(result.result, json!({"hostids": ["10085"]}));
        let created = &api.calls_to("host.create")[0];
        assert_eq!(created["groups"], json!([{"groupid": "2"}]));
    }

    #[tokio::test]
    async fn test_unchanged_host_makes_no_update() {
        let api = MockApi::new()
            .with("host.get", existing())
            .with("hostgroup.get", json!([{"groupid": "2", "name": "Linux servers"}]));
        let caps = caps();
        let context = ModuleContext { api: &api, capabilities: &caps, check_mode: false };

        let result = HostModule::new()
            .execute(
                &args(json!({"host": "web01", "hostgroups": ["Linux servers"], "status": "enabled"})),
                &context,
            )
            .await
            .unwrap();

        assert!(!result.changed);
        assert!(api.calls_to("host.update").is_empty());
    }

    #[tokio::test]
    async fn test_update_sends_only_diff() {
        let api = MockApi::new()
            .with("host.get", existing())
            .with("host.update", json!({"hostids": ["10084"]}));
        let caps = caps();
        let context = ModuleContext { api: &api, capabilities: &caps, check_mode: false };

        let result = HostModule::new()
            .execute(
                &args(json!({"host": "web01", "status": "disabled", "description": ""})),
                &context,
            )
            .await
            .unwrap();

        assert!(result.changed);
        assert_eq!(
            api.calls_to("host.update")[0],
            json!({"hostid": "10084", "status": "1", "description": ""})
        );
    }

    #[tokio::test]
    async fn test_check_mode_makes_no_mutating_call() {
        let api = MockApi::new().with("host.get", existing());
        let caps = caps();
        let context = ModuleContext { api: &api, capabilities: &caps, check_mode: true };

        let result = HostModule::new()
            .execute(&args(json!({"host": "web01", "state": "absent"})), &context)
            .await
            .unwrap();

        assert!(result.changed);
        assert_eq!(api.methods(), vec!["host.get"]);
    }

    #[tokio::test]
    async fn test_delete_host() {
        let api = MockApi::new()
            .with("host.get", existing())
            .with("host.delete", json!({"hostids": ["10084"]}));
        let caps = caps();
        let context = ModuleContext { api: &api, capabilities: &caps, check_mode: false };

        let result = HostModule::new()
            .execute(&args(json!({"host": "web01", "state": "absent"})), &context)
            .await
            .unwrap();

        assert!(result.changed);
        assert_eq!(api.calls_to("host.delete")[0], json!(["10084"]));
    }

    #[tokio::test]
    async fn test_fetch_uses_version_group_selector() {
        let api = MockApi::new().with("host.get", json!([]));
        let old = ApiCapabilities::for_version(&"6.0".parse().unwrap());
        fetch_host(&api, &old, "web01").await.unwrap();
        let params = &api.calls_to("host.get")[0];
        assert!(params.get("selectGroups").is_some());
        assert!(params.get("selectHostGroups").is_none());
    }
}
