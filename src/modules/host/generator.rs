//! Build the desired host object from task parameters

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::api::ZabbixApi;
use crate::modules::error::{ReconcileError, ValidationErrors};
use crate::modules::field::{scalar_string, Field};
use crate::modules::host::interfaces::build_interfaces;
use crate::modules::host::params::{normalize_macro_name, HostParams};
use crate::modules::resolve::{self, resolve_ids, resolve_one};
use crate::modules::tables::{self, HOST_STATUS, INVENTORY_MODE, IPMI_AUTHTYPE, IPMI_PRIVILEGE, MACRO_TYPE};
use crate::modules::tls::{self, PskInput};
use crate::version::ApiCapabilities;

const IPMI_AUTHTYPE_DEFAULT: &str = "-1";
const IPMI_PRIVILEGE_DEFAULT: &str = "2";
const INVENTORY_DISABLED: &str = "-1";

/// Turn host parameters into a `host.create`/`host.update` payload.
///
/// `existing` is only consulted for state the API will not echo back (PSK)
/// and for clearing inventory fields.
pub async fn generate_host(
    api: &dyn ZabbixApi,
    capabilities: &ApiCapabilities,
    params: &HostParams,
    existing: Option<&Value>,
) -> Result<Map<String, Value>, ReconcileError> {
    params.validate(Some(capabilities))?;

    let mut errors = ValidationErrors::new();
    let mut desired = Map::new();
    desired.insert("host".to_string(), Value::String(params.host.clone()));

    match &params.name {
        Field::Value(name) => insert_str(&mut desired, "name", name),
        Field::Clear => insert_str(&mut desired, "name", &params.host),
        Field::Unset => {}
    }

    for (key, field) in [
        ("description", &params.description),
        ("ipmi_username", &params.ipmi_username),
        ("ipmi_password", &params.ipmi_password),
        ("tls_issuer", &params.tls_issuer),
        ("tls_subject", &params.tls_subject),
    ] {
        copy_verbatim(&mut desired, key, field);
    }

    if let Field::Value(status) = &params.status {
        insert_str(&mut desired, "status", tables::code(&HOST_STATUS, "status", status)?);
    }
    translate_or_reset(
        &mut desired,
        "ipmi_authtype",
        &params.ipmi_authtype,
        &IPMI_AUTHTYPE,
        IPMI_AUTHTYPE_DEFAULT,
    )?;
    translate_or_reset(
        &mut desired,
        "ipmi_privilege",
        &params.ipmi_privilege,
        &IPMI_PRIVILEGE,
        IPMI_PRIVILEGE_DEFAULT,
    )?;
    translate_or_reset(
        &mut desired,
        "inventory_mode",
        &params.inventory_mode,
        &INVENTORY_MODE,
        INVENTORY_DISABLED,
    )?;

    match &params.inventory {
        Field::Value(fields) => {
            let inventory: Map<String, Value> = fields
                .iter()
                .map(|(key, value)| {
                    let text = scalar_string(value).unwrap_or_default();
                    (key.clone(), Value::String(text))
                })
                .collect();
            desired.insert("inventory".to_string(), Value::Object(inventory));
        }
        Field::Clear => {
            let cleared: Map<String, Value> = existing
                .and_then(|host| host.get("inventory"))
                .and_then(Value::as_object)
                .map(|current| {
                    current
                        .iter()
                        .filter(|(key, value)| {
                            tables::is_inventory_field(key)
                                && scalar_string(value).is_some_and(|v| !v.is_empty())
                        })
                        .map(|(key, _)| (key.clone(), Value::String(String::new())))
                        .collect()
                })
                .unwrap_or_default();
            if !cleared.is_empty() {
                desired.insert("inventory".to_string(), Value::Object(cleared));
            }
        }
        Field::Unset => {}
    }

    apply_tls(&mut desired, params, existing, &mut errors);

    match &params.tags {
        Field::Value(tags) => {
            let tags: Vec<Value> = tags
                .iter()
                .map(|t| json!({"tag": t.tag, "value": t.value}))
                .collect();
            desired.insert("tags".to_string(), Value::Array(tags));
        }
        Field::Clear => {
            desired.insert("tags".to_string(), json!([]));
        }
        Field::Unset => {}
    }

    match &params.macros {
        Field::Value(macros) => {
            let mut built = Vec::with_capacity(macros.len());
            for item in macros {
                match normalize_macro_name(&item.name) {
                    Ok(name) => built.push(json!({
                        "macro": name,
                        "value": item.value,
                        "description": item.description,
                        "type": tables::code(&MACRO_TYPE, "macro type", &item.macro_type)?,
                    })),
                    Err(message) => errors.push(message),
                }
            }
            desired.insert("macros".to_string(), Value::Array(built));
        }
        Field::Clear => {
            desired.insert("macros".to_string(), json!([]));
        }
        Field::Unset => {}
    }

    match &params.interfaces {
        Field::Value(interfaces) => match build_interfaces(interfaces, capabilities) {
            Ok(built) => {
                desired.insert("interfaces".to_string(), Value::Array(built));
            }
            Err(ReconcileError::Validation { errors: problems }) => {
                problems.into_iter().for_each(|p| errors.push(p));
            }
            Err(other) => return Err(other),
        },
        Field::Clear => {
            desired.insert("interfaces".to_string(), json!([]));
        }
        Field::Unset => {}
    }

    // Everything local is checked before the first lookup call.
    errors.into_result()?;

    if let Field::Value(names) = &params.hostgroups {
        let ids = resolve_ids(api, resolve::HOST_GROUPS, names).await?;
        desired.insert("groups".to_string(), id_objects("groupid", ids));
    }

    match &params.templates {
        Field::Value(names) => {
            let ids = resolve_ids(api, resolve::TEMPLATES, names).await?;
            desired.insert("templates".to_string(), id_objects("templateid", ids));
        }
        Field::Clear => {
            desired.insert("templates".to_string(), json!([]));
        }
        Field::Unset => {}
    }

    apply_monitoring_source(api, capabilities, params, &mut desired).await?;

    debug!("Generated {} field(s) for host {}", desired.len(), params.host);
    Ok(desired)
}

fn apply_tls(
    desired: &mut Map<String, Value>,
    params: &HostParams,
    existing: Option<&Value>,
    errors: &mut ValidationErrors,
) {
    let accept = match tls::tls_accept_field(&params.tls_accept) {
        Ok(accept) => accept,
        Err(problems) => {
            errors.extend(problems);
            None
        }
    };
    let connect = match tls::tls_connect_field(&params.tls_connect) {
        Ok(connect) => connect,
        Err(problems) => {
            errors.extend(problems);
            None
        }
    };

    let psk_selected = if accept.is_none() && connect.is_none() {
        None
    } else {
        let current = |key: &str| {
            existing
                .and_then(|host| host.get(key))
                .and_then(scalar_string)
        };
        let accept_now = accept.clone().or_else(|| current("tls_accept"));
        let connect_now = connect.clone().or_else(|| current("tls_connect"));
        Some(
            accept_now.is_some_and(|mask| tls::mask_has_psk(&mask))
                || connect_now.is_some_and(|mode| tls::mask_has_psk(&mode)),
        )
    };

    if let Some(accept) = accept {
        insert_str(desired, "tls_accept", &accept);
    }
    if let Some(connect) = connect {
        insert_str(desired, "tls_connect", &connect);
    }

    tls::apply_psk(
        desired,
        PskInput {
            identity: &params.tls_psk_identity,
            psk: &params.tls_psk,
        },
        psk_selected,
        tls::existing_uses_psk(existing),
        errors,
    );
}

/// Proxy or proxy group monitoring. On 7.0+ this is `monitored_by` plus the
/// matching id; older versions only know `proxy_hostid`.
async fn apply_monitoring_source(
    api: &dyn ZabbixApi,
    capabilities: &ApiCapabilities,
    params: &HostParams,
    desired: &mut Map<String, Value>,
) -> Result<(), ReconcileError> {
    let proxy_field = capabilities.host_proxy_field;

    match &params.proxy {
        Field::Value(name) => {
            let id = resolve_one(api, resolve::proxies(capabilities), name).await?;
            if capabilities.supports_monitored_by {
                insert_str(desired, "monitored_by", "1");
            }
            insert_str(desired, proxy_field, &id);
        }
        Field::Clear => {
            if capabilities.supports_monitored_by && params.proxy_group.is_unset() {
                insert_str(desired, "monitored_by", "0");
            }
            insert_str(desired, proxy_field, "0");
        }
        Field::Unset => {}
    }

    if !capabilities.supports_proxy_groups {
        return Ok(());
    }

    match &params.proxy_group {
        Field::Value(name) => {
            let id = resolve_one(api, resolve::PROXY_GROUPS, name).await?;
            insert_str(desired, "monitored_by", "2");
            insert_str(desired, "proxy_groupid", &id);
        }
        Field::Clear => {
            if params.proxy.is_unset() {
                insert_str(desired, "monitored_by", "0");
            }
            insert_str(desired, "proxy_groupid", "0");
        }
        Field::Unset => {}
    }

    Ok(())
}

fn insert_str(desired: &mut Map<String, Value>, key: &str, value: &str) {
    desired.insert(key.to_string(), Value::String(value.to_string()));
}

fn copy_verbatim(desired: &mut Map<String, Value>, key: &str, field: &Field<String>) {
    match field {
        Field::Value(value) => insert_str(desired, key, value),
        Field::Clear => insert_str(desired, key, ""),
        Field::Unset => {}
    }
}

fn translate_or_reset(
    desired: &mut Map<String, Value>,
    key: &str,
    field: &Field<String>,
    table: &tables::CodeTable,
    reset: &str,
) -> Result<(), ReconcileError> {
    match field {
        Field::Value(choice) => insert_str(desired, key, tables::code(table, key, choice)?),
        Field::Clear => insert_str(desired, key, reset),
        Field::Unset => {}
    }
    Ok(())
}

fn id_objects(id_field: &str, ids: Vec<String>) -> Value {
    Value::Array(
        ids.into_iter()
            .map(|id| {
                let mut object = Map::new();
                object.insert(id_field.to_string(), Value::String(id));
                Value::Object(object)
            })
            .collect(),
    )
}
