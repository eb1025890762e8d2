//! Proxy module - manages Zabbix proxies

pub mod compare;
pub mod generator;
pub mod params;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::api::ZabbixApi;
use crate::modules::compare::{changed_fields, redact};
use crate::modules::error::ReconcileError;
use crate::modules::field::scalar_string;
use crate::modules::interface::{ModuleArgs, ModuleContext, ModuleResult, State, ZabbixModule};
use crate::version::ApiCapabilities;

pub use compare::compare_proxy;
pub use generator::{effective_mode, generate_proxy, ProxyMode};
pub use params::ProxyParams;

/// Proxy module - creates, updates and deletes proxies
#[derive(Debug, Default)]
pub struct ProxyModule;

impl ProxyModule {
    pub fn new() -> Self {
        Self
    }
}

/// Fetch a proxy by name. The name field and the interface selector depend
/// on the API version.
pub async fn fetch_proxy(
    api: &dyn ZabbixApi,
    capabilities: &ApiCapabilities,
    name: &str,
) -> Result<Option<Value>, ReconcileError> {
    let mut filter = Map::new();
    filter.insert(capabilities.proxy_name_field.to_string(), json!([name]));

    let mut params = Map::new();
    params.insert("output".to_string(), json!("extend"));
    params.insert("filter".to_string(), Value::Object(filter));
    if !capabilities.supports_proxy_groups {
        params.insert("selectInterface".to_string(), json!("extend"));
    }

    let found = api.call("proxy.get", Value::Object(params)).await?;
    Ok(found.as_array().and_then(|proxies| proxies.first()).cloned())
}

#[async_trait]
impl ZabbixModule for ProxyModule {
    fn name(&self) -> &'static str {
        "proxy"
    }

    fn validate_args(&self, args: &ModuleArgs) -> Result<(), ReconcileError> {
        args.parse::<ProxyParams>()?.validate(None)
    }

    async fn execute(
        &self,
        args: &ModuleArgs,
        context: &ModuleContext<'_>,
    ) -> Result<ModuleResult, ReconcileError> {
        let params: ProxyParams = args.parse()?;
        params.validate(Some(context.capabilities))?;
        let name = params.name.as_str();

        let existing = fetch_proxy(context.api, context.capabilities, name).await?;
        debug!("Proxy {} exists: {}", name, existing.is_some());

        match (params.state, existing) {
            (State::Absent, None) => Ok(ModuleResult::unchanged(format!(
                "Proxy {name} does not exist"
            ))),
            (State::Absent, Some(proxy)) => {
                let id = proxy_id(&proxy)?;
                if context.check_mode {
                    return Ok(ModuleResult::changed(
                        format!("Proxy {name} would be deleted"),
                        Value::Null,
                    ));
                }
                context.api.call("proxy.delete", json!([id])).await?;
                info!("Deleted proxy {}", name);
                Ok(ModuleResult::changed(
                    format!("Proxy {name} deleted"),
                    json!({ "proxyids": [id] }),
                ))
            }
            (State::Present, None) => {
                let desired =
                    generate_proxy(context.api, context.capabilities, &params, None).await?;
                if context.check_mode {
                    return Ok(ModuleResult::changed(
                        format!("Proxy {name} would be created"),
                        redact(&desired),
                    ));
                }
                let created = context
                    .api
                    .call("proxy.create", Value::Object(desired.clone()))
                    .await?;
                info!("Created proxy {}", name);
                Ok(ModuleResult::changed(format!("Proxy {name} created"), created)
                    .with_diff(json!({}), redact(&desired)))
            }
            (State::Present, Some(proxy)) => {
                let desired =
                    generate_proxy(context.api, context.capabilities, &params, Some(&proxy))
                        .await?;
                let mut diff = compare_proxy(&proxy, &desired);
                if diff.is_empty() {
                    return Ok(ModuleResult::unchanged(format!("Proxy {name} is up to date")));
                }

                let before = changed_fields(&proxy, &diff);
                let after = redact(&diff);
                if context.check_mode {
                    return Ok(ModuleResult::changed(
                        format!("Proxy {name} would be updated"),
                        Value::Null,
                    )
                    .with_diff(before, after));
                }

                diff.insert("proxyid".to_string(), Value::String(proxy_id(&proxy)?));
                let updated = context.api.call("proxy.update", Value::Object(diff)).await?;
                info!("Updated proxy {}", name);
                Ok(ModuleResult::changed(format!("Proxy {name} updated"), updated)
                    .with_diff(before, after))
            }
        }
    }
}

fn proxy_id(proxy: &Value) -> Result<String, ReconcileError> {
    proxy
        .get("proxyid")
        .and_then(scalar_string)
        .ok_or_else(|| ReconcileError::RemoteApi {
            message: "proxy.get returned a proxy without proxyid".to_string(),
        })
}
