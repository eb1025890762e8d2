//! Name to id lookups for referenced Zabbix objects

use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::debug;

use crate::api::ZabbixApi;
use crate::modules::error::ReconcileError;
use crate::version::ApiCapabilities;

/// How to look up one kind of object by name.
#[derive(Debug, Clone, Copy)]
pub struct Lookup {
    pub kind: &'static str,
    pub method: &'static str,
    pub id_field: &'static str,
    pub name_field: &'static str,
}

pub const HOST_GROUPS: Lookup = Lookup {
    kind: "Host group",
    method: "hostgroup.get",
    id_field: "groupid",
    name_field: "name",
};

pub const TEMPLATES: Lookup = Lookup {
    kind: "Template",
    method: "template.get",
    id_field: "templateid",
    name_field: "name",
};

pub const PROXY_GROUPS: Lookup = Lookup {
    kind: "Proxy group",
    method: "proxygroup.get",
    id_field: "proxy_groupid",
    name_field: "name",
};

pub fn proxies(capabilities: &ApiCapabilities) -> Lookup {
    Lookup {
        kind: "Proxy",
        method: "proxy.get",
        id_field: "proxyid",
        name_field: capabilities.proxy_name_field,
    }
}

/// Resolve every name to its id, in input order. Any missing name is fatal
/// and all missing names are reported together.
pub async fn resolve_ids(
    api: &dyn ZabbixApi,
    lookup: Lookup,
    names: &[String],
) -> Result<Vec<String>, ReconcileError> {
    if names.is_empty() {
        return Ok(Vec::new());
    }

    let mut filter = serde_json::Map::new();
    filter.insert(lookup.name_field.to_string(), json!(names));
    let params = json!({
        "output": [lookup.id_field, lookup.name_field],
        "filter": filter,
    });
    let found = api.call(lookup.method, params).await?;

    let by_name: HashMap<String, String> = found
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let name = value_str(item.get(lookup.name_field)?)?;
                    let id = value_str(item.get(lookup.id_field)?)?;
                    Some((name, id))
                })
                .collect()
        })
        .unwrap_or_default();

    let missing: Vec<String> = names
        .iter()
        .filter(|name| !by_name.contains_key(*name))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(ReconcileError::not_found(lookup.kind, missing));
    }

    let mut ids: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let id = &by_name[name];
        if !ids.contains(id) {
            ids.push(id.clone());
        }
    }

    debug!("Resolved {} {} name(s)", ids.len(), lookup.kind.to_lowercase());
    Ok(ids)
}

pub async fn resolve_one(
    api: &dyn ZabbixApi,
    lookup: Lookup,
    name: &str,
) -> Result<String, ReconcileError> {
    let ids = resolve_ids(api, lookup, &[name.to_string()]).await?;
    ids.into_iter()
        .next()
        .ok_or_else(|| ReconcileError::not_found(lookup.kind, vec![name.to_string()]))
}

fn value_str(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
