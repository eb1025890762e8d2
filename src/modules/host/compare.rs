//! Compare a desired host against the object returned by `host.get`

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use crate::modules::compare::{diff_scalars, id_set, keyed_multiset, nested_differs};
use crate::modules::error::ReconcileError;
use crate::modules::field::scalar_string;
use crate::modules::tables::{self, INTERFACE_TYPE};
use crate::version::ApiCapabilities;

const HOST_SCALARS: &[&str] = &[
    "host",
    "name",
    "status",
    "description",
    "ipmi_authtype",
    "ipmi_privilege",
    "ipmi_username",
    "ipmi_password",
    "tls_connect",
    "tls_accept",
    "tls_issuer",
    "tls_subject",
    "inventory_mode",
    "monitored_by",
    "proxyid",
    "proxy_hostid",
    "proxy_groupid",
];

/// Never returned by the API, so they go out whenever given.
const WRITE_ONLY: &[&str] = &["tls_psk_identity", "tls_psk"];

const SECRET_MACRO: &str = "1";

/// Produce the minimal update for `existing`. An empty map means in sync.
pub fn compare_host(
    existing: &Value,
    desired: &Map<String, Value>,
    capabilities: &ApiCapabilities,
) -> Result<Map<String, Value>, ReconcileError> {
    let existing_interfaces = interfaces_by_type(existing.get("interfaces"))?;
    let mut diff = Map::new();

    diff_scalars(existing, desired, HOST_SCALARS, &mut diff);

    for field in WRITE_ONLY {
        if let Some(value) = desired.get(*field) {
            diff.insert(field.to_string(), value.clone());
        }
    }

    if let Some(groups) = desired.get("groups") {
        let current = id_set(existing.get(capabilities.host_groups_key), "groupid");
        if current != id_set(Some(groups), "groupid") {
            diff.insert("groups".to_string(), groups.clone());
        }
    }

    if let Some(templates) = desired.get("templates") {
        let current = id_set(existing.get("parentTemplates"), "templateid");
        let wanted = id_set(Some(templates), "templateid");
        if current != wanted {
            diff.insert("templates".to_string(), templates.clone());
            let unlinked: Vec<Value> = current
                .difference(&wanted)
                .map(|id| serde_json::json!({ "templateid": id }))
                .collect();
            if !unlinked.is_empty() {
                diff.insert("templates_clear".to_string(), Value::Array(unlinked));
            }
        }
    }

    if let Some(tags) = desired.get("tags") {
        let automatic = |tag: &Value| {
            tag.get("automatic").and_then(scalar_string).as_deref() == Some("1")
        };
        let current = keyed_multiset(existing.get("tags"), "tag", &["value"], automatic);
        let wanted = keyed_multiset(Some(tags), "tag", &["value"], |_| false);
        if current != wanted {
            diff.insert("tags".to_string(), tags.clone());
        }
    }

    if let Some(macros) = desired.get("macros") {
        if macros_differ(existing.get("macros"), macros) {
            diff.insert("macros".to_string(), macros.clone());
        }
    }

    if let Some(Value::Array(wanted)) = desired.get("interfaces") {
        if let Some(merged) = reconcile_interfaces(&existing_interfaces, wanted) {
            diff.insert("interfaces".to_string(), Value::Array(merged));
        }
    }

    if let Some(inventory) = desired.get("inventory") {
        // Zabbix returns `[]` for inventory when it is disabled.
        let current = existing.get("inventory").filter(|v| v.is_object());
        if nested_differs(current, inventory) {
            diff.insert("inventory".to_string(), inventory.clone());
        }
    }

    Ok(diff)
}

/// Index existing interfaces by type. Two interfaces of one type cannot be
/// matched to the single desired interface of that type.
fn interfaces_by_type(list: Option<&Value>) -> Result<HashMap<String, &Value>, ReconcileError> {
    let mut by_type: HashMap<String, &Value> = HashMap::new();
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();

    for interface in list.and_then(Value::as_array).into_iter().flatten() {
        let Some(kind) = interface.get("type").and_then(scalar_string) else {
            continue;
        };
        *counts.entry(kind.clone()).or_default() += 1;
        by_type.insert(kind, interface);
    }

    let duplicated: Vec<String> = counts
        .iter()
        .filter(|(_, count)| **count > 1)
        .map(|(kind, count)| {
            let name = tables::name_for_code(&INTERFACE_TYPE, kind).unwrap_or(kind.as_str());
            format!("{count} interfaces with type '{name}'")
        })
        .collect();
    if !duplicated.is_empty() {
        return Err(ReconcileError::Conflict {
            reason: format!(
                "host has more than one interface of a type ({}); remove the extra interfaces in Zabbix first",
                duplicated.join(", ")
            ),
        });
    }

    Ok(by_type)
}

/// Desired interfaces with `interfaceid` carried over from the existing
/// interface of the same type. `None` when nothing changes.
fn reconcile_interfaces(
    existing: &HashMap<String, &Value>,
    wanted: &[Value],
) -> Option<Vec<Value>> {
    let mut changed = existing.len() != wanted.len();
    let mut merged = Vec::with_capacity(wanted.len());

    for interface in wanted {
        let kind = interface.get("type").and_then(scalar_string).unwrap_or_default();
        let mut interface = interface.clone();
        match existing.get(&kind) {
            Some(current) => {
                if nested_differs(Some(*current), &interface) {
                    changed = true;
                }
                if let (Value::Object(object), Some(id)) = (&mut interface, current.get("interfaceid")) {
                    object.insert("interfaceid".to_string(), id.clone());
                }
            }
            None => changed = true,
        }
        merged.push(interface);
    }

    changed.then_some(merged)
}

fn macros_differ(existing: Option<&Value>, wanted: &Value) -> bool {
    let index = |list: Option<&Value>| -> BTreeMap<String, Value> {
        list.and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|item| {
                let name = item.get("macro").and_then(scalar_string)?;
                Some((name, item.clone()))
            })
            .collect()
    };

    let current = index(existing);
    let wanted = index(Some(wanted));
    if current.keys().ne(wanted.keys()) {
        return true;
    }

    wanted.iter().any(|(name, macro_)| {
        let Some(existing) = current.get(name) else {
            return true;
        };
        let field = |item: &Value, key: &str| item.get(key).and_then(scalar_string).unwrap_or_default();
        let kind = field(macro_, "type");

        // Secret values are never returned, so a secret macro is always sent.
        kind == SECRET_MACRO
            || field(existing, "type") != kind
            || field(existing, "description") != field(macro_, "description")
            || field(existing, "value") != field(macro_, "value")
    })
}
