//! `host.get` query for an inventory source

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::api::ZabbixApi;
use crate::inventory::error::InventoryError;
use crate::inventory::filter::{parse_tag_filters, parse_tags_behavior, TagFilter, TagsBehavior};
use crate::inventory::preload::preload_host_ids;
use crate::inventory::source::InventorySource;
use crate::modules::resolve::{self, resolve_ids};
use crate::modules::tables::{self, HOST_STATUS};
use crate::version::ApiCapabilities;

const HOST_GROUP_SELECTS: &[&str] = &["selectHostGroups", "selectGroups"];
const KNOWN_SELECTS: &[&str] = &[
    "selectParentTemplates",
    "selectTags",
    "selectInterfaces",
    "selectInventory",
    "selectMacros",
];

/// A prepared host query plus the tag filters it carries.
#[derive(Debug, Clone)]
pub struct HostQuery {
    pub params: Map<String, Value>,
    pub tag_filters: Vec<TagFilter>,
    pub behavior: TagsBehavior,
}

/// Resolve filter names and assemble `host.get` parameters.
pub async fn build_query(
    api: &dyn ZabbixApi,
    capabilities: &ApiCapabilities,
    source: &InventorySource,
) -> Result<HostQuery, InventoryError> {
    let filter = &source.filter;
    let tag_filters = parse_tag_filters(&filter.tags)?;
    let behavior = parse_tags_behavior(filter.tags_behavior.as_deref())?;
    let status = filter
        .status
        .as_deref()
        .map(|status| tables::code(&HOST_STATUS, "filter.status", status))
        .transpose()?;

    let mut params = Map::new();
    params.insert("output".to_string(), output(source));
    apply_selects(&mut params, capabilities, source)?;

    if !filter.hostgroups.is_empty() {
        let ids = resolve_ids(api, resolve::HOST_GROUPS, &filter.hostgroups).await?;
        params.insert("groupids".to_string(), json!(ids));
    }
    if !filter.templates.is_empty() {
        let ids = resolve_ids(api, resolve::TEMPLATES, &filter.templates).await?;
        params.insert("templateids".to_string(), json!(ids));
    }
    if !filter.proxy.is_empty() {
        let ids = resolve_ids(api, resolve::proxies(capabilities), &filter.proxy).await?;
        params.insert("proxyids".to_string(), json!(ids));
    }

    let mut exact = Map::new();
    if !filter.host.is_empty() {
        exact.insert("host".to_string(), json!(filter.host));
    }
    if let Some(status) = status {
        exact.insert("status".to_string(), json!(status));
    }
    if !exact.is_empty() {
        params.insert("filter".to_string(), Value::Object(exact));
    }

    if !tag_filters.is_empty() {
        if let Some(evaltype) = behavior.evaltype() {
            let tags: Vec<Value> = tag_filters.iter().map(TagFilter::to_api).collect();
            params.insert("tags".to_string(), Value::Array(tags));
            params.insert("evaltype".to_string(), json!(evaltype));
        }
    }

    Ok(HostQuery {
        params,
        tag_filters,
        behavior,
    })
}

/// Fetch the hosts selected by `source`, preloading tags first under strict
/// AND.
pub async fn fetch_hosts(
    api: &dyn ZabbixApi,
    capabilities: &ApiCapabilities,
    source: &InventorySource,
) -> Result<Vec<Value>, InventoryError> {
    let mut query = build_query(api, capabilities, source).await?;

    if query.behavior == TagsBehavior::And && !query.tag_filters.is_empty() {
        let ids = preload_host_ids(api, &query.params, &query.tag_filters).await?;
        if ids.is_empty() {
            info!("No hosts match all tag filters");
            return Ok(Vec::new());
        }
        query.params.insert("hostids".to_string(), json!(ids));
    }

    let hosts = api.call("host.get", Value::Object(query.params)).await?;
    let hosts = match hosts {
        Value::Array(hosts) => hosts,
        other => {
            return Err(InventoryError::Api {
                message: format!("host.get returned {other}"),
            })
        }
    };

    info!("Fetched {} host(s) from Zabbix", hosts.len());
    Ok(hosts)
}

fn output(source: &InventorySource) -> Value {
    let Some(fields) = &source.output else {
        return json!("extend");
    };

    let mut fields = fields.clone();
    let mut required = vec!["hostid", "host"];
    if source.group_by.status {
        required.push("status");
    }
    for field in required {
        if !fields.iter().any(|f| f == field) {
            fields.push(field.to_string());
        }
    }
    json!(fields)
}

fn apply_selects(
    params: &mut Map<String, Value>,
    capabilities: &ApiCapabilities,
    source: &InventorySource,
) -> Result<(), InventoryError> {
    let mut unknown = Vec::new();

    for (name, enabled) in &source.selects {
        let key = if HOST_GROUP_SELECTS.contains(&name.as_str()) {
            capabilities.host_groups_select
        } else if let Some(known) = KNOWN_SELECTS.iter().find(|known| **known == name.as_str()) {
            *known
        } else {
            unknown.push(format!("Unknown select: {name}"));
            continue;
        };
        if *enabled {
            params.insert(key.to_string(), json!("extend"));
        }
    }

    if !unknown.is_empty() {
        return Err(InventoryError::InvalidFilter { errors: unknown });
    }

    let group_by = &source.group_by;
    let mut needed = vec!["selectInterfaces"];
    if group_by.hostgroups {
        needed.push(capabilities.host_groups_select);
    }
    if group_by.templates {
        needed.push("selectParentTemplates");
    }
    if group_by.tags {
        needed.push("selectTags");
    }
    for key in needed {
        if !params.contains_key(key) {
            debug!("Enabling {} for grouping", key);
            params.insert(key.to_string(), json!("extend"));
        }
    }

    Ok(())
}
