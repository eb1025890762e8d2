//! Host group module - ensures a set of host groups exists or is gone

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use tracing::info;

use crate::api::ZabbixApi;
use crate::modules::error::{ReconcileError, ValidationErrors};
use crate::modules::field::scalar_string;
use crate::modules::interface::{ModuleArgs, ModuleContext, ModuleResult, State, ZabbixModule};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostGroupParams {
    pub state: State,
    #[serde(alias = "host_groups")]
    pub name: Vec<String>,
}

impl HostGroupParams {
    pub fn validate(&self) -> Result<(), ReconcileError> {
        let mut errors = ValidationErrors::new();
        if self.name.is_empty() {
            errors.push("name must list at least one host group");
        }
        if self.name.iter().any(|name| name.trim().is_empty()) {
            errors.push("host group names must not be empty");
        }
        errors.into_result()
    }
}

/// Existing groups among `names`, as name to id.
pub async fn existing_groups(
    api: &dyn ZabbixApi,
    names: &[String],
) -> Result<HashMap<String, String>, ReconcileError> {
    let found = api
        .call(
            "hostgroup.get",
            json!({"output": ["groupid", "name"], "filter": {"name": names}}),
        )
        .await?;

    Ok(found
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|group| {
            let name = group.get("name").and_then(scalar_string)?;
            let id = group.get("groupid").and_then(scalar_string)?;
            Some((name, id))
        })
        .collect())
}

#[derive(Debug, Default)]
pub struct HostGroupModule;

impl HostGroupModule {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ZabbixModule for HostGroupModule {
    fn name(&self) -> &'static str {
        "hostgroup"
    }

    fn validate_args(&self, args: &ModuleArgs) -> Result<(), ReconcileError> {
        args.parse::<HostGroupParams>()?.validate()
    }

    async fn execute(
        &self,
        args: &ModuleArgs,
        context: &ModuleContext<'_>,
    ) -> Result<ModuleResult, ReconcileError> {
        let params: HostGroupParams = args.parse()?;
        params.validate()?;

        let mut seen = HashSet::new();
        let names: Vec<String> = params
            .name
            .iter()
            .filter(|name| seen.insert(name.as_str()))
            .cloned()
            .collect();
        let existing = existing_groups(context.api, &names).await?;

        match params.state {
            State::Present => {
                let missing: Vec<&String> =
                    names.iter().filter(|name| !existing.contains_key(*name)).collect();
                if missing.is_empty() {
                    return Ok(ModuleResult::unchanged("Host groups already exist"));
                }
                let listed = join(&missing);
                if context.check_mode {
                    return Ok(ModuleResult::changed(
                        format!("Host groups would be created: {listed}"),
                        Value::Null,
                    ));
                }

                let payload: Vec<Value> = missing.iter().map(|name| json!({ "name": name })).collect();
                let created = context.api.call("hostgroup.create", Value::Array(payload)).await?;
                info!("Created host groups: {}", listed);
                Ok(ModuleResult::changed(format!("Host groups created: {listed}"), created))
            }
            State::Absent => {
                let present: Vec<&String> =
                    names.iter().filter(|name| existing.contains_key(*name)).collect();
                if present.is_empty() {
                    return Ok(ModuleResult::unchanged("Host groups do not exist"));
                }
                let listed = join(&present);
                if context.check_mode {
                    return Ok(ModuleResult::changed(
                        format!("Host groups would be deleted: {listed}"),
                        Value::Null,
                    ));
                }

                let ids: Vec<&String> = present.iter().filter_map(|name| existing.get(*name)).collect();
                let deleted = context.api.call("hostgroup.delete", json!(ids)).await?;
                info!("Deleted host groups: {}", listed);
                Ok(ModuleResult::changed(format!("Host groups deleted: {listed}"), deleted))
            }
        }
    }
}

fn join(names: &[&String]) -> String {
    names.iter().map(|name| name.as_str()).collect::<Vec<_>>().join(", ")
}
