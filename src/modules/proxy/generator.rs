//! Build the desired proxy object from task parameters

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::api::ZabbixApi;
use crate::modules::error::{ReconcileError, ValidationErrors};
use crate::modules::field::{scalar_string, Field};
use crate::modules::proxy::params::{ProxyInterfaceParam, ProxyParams};
use crate::modules::resolve::{self, resolve_one};
use crate::modules::tables::INTERFACE_USEIP;
use crate::modules::tls::{self, PskInput, UNENCRYPTED};
use crate::version::ApiCapabilities;

const DEFAULT_ADDRESS: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "10051";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyMode {
    Active,
    Passive,
}

impl ProxyMode {
    fn as_str(self) -> &'static str {
        match self {
            ProxyMode::Active => "active",
            ProxyMode::Passive => "passive",
        }
    }
}

/// Mode from the task, else from the existing proxy, else active.
pub fn effective_mode(
    params: &ProxyParams,
    capabilities: &ApiCapabilities,
    existing: Option<&Value>,
) -> ProxyMode {
    let given = params.mode.value().map(String::as_str);
    let inherited = || {
        existing
            .and_then(|proxy| proxy.get(capabilities.proxy_mode_field))
            .and_then(scalar_string)
            .and_then(|code| capabilities.proxy_mode_name(&code))
    };

    match given.or_else(inherited) {
        Some("passive") => ProxyMode::Passive,
        _ => ProxyMode::Active,
    }
}

/// Turn proxy parameters into a `proxy.create`/`proxy.update` payload.
pub async fn generate_proxy(
    api: &dyn ZabbixApi,
    capabilities: &ApiCapabilities,
    params: &ProxyParams,
    existing: Option<&Value>,
) -> Result<Map<String, Value>, ReconcileError> {
    params.validate(Some(capabilities))?;

    let mut errors = ValidationErrors::new();
    let mut desired = Map::new();
    let mode = effective_mode(params, capabilities, existing);

    insert_str(&mut desired, capabilities.proxy_name_field, &params.name);
    insert_str(
        &mut desired,
        capabilities.proxy_mode_field,
        capabilities.proxy_mode_code(mode.as_str()),
    );

    match &params.description {
        Field::Value(description) => insert_str(&mut desired, "description", description),
        Field::Clear => insert_str(&mut desired, "description", ""),
        Field::Unset => {}
    }
    match &params.tls_issuer {
        Field::Value(issuer) => insert_str(&mut desired, "tls_issuer", issuer),
        Field::Clear => insert_str(&mut desired, "tls_issuer", ""),
        Field::Unset => {}
    }
    match &params.tls_subject {
        Field::Value(subject) => insert_str(&mut desired, "tls_subject", subject),
        Field::Clear => insert_str(&mut desired, "tls_subject", ""),
        Field::Unset => {}
    }

    let psk_selected = match mode {
        ProxyMode::Active => active_settings(&mut desired, capabilities, params, &mut errors),
        ProxyMode::Passive => {
            passive_settings(&mut desired, capabilities, params, existing, &mut errors)
        }
    };

    tls::apply_psk(
        &mut desired,
        PskInput {
            identity: &params.tls_psk_identity,
            psk: &params.tls_psk,
        },
        psk_selected,
        tls::existing_uses_psk(existing),
        &mut errors,
    );

    match &params.custom_timeouts {
        Field::Value(timeouts) => {
            insert_str(&mut desired, "custom_timeouts", "1");
            for (kind, timeout) in timeouts {
                insert_str(&mut desired, &format!("timeout_{kind}"), timeout);
            }
        }
        Field::Clear => insert_str(&mut desired, "custom_timeouts", "0"),
        Field::Unset => {}
    }

    if let Field::Value(_) = &params.proxy_group {
        let local_address = params.local_address.value().cloned().or_else(|| {
            existing
                .and_then(|proxy| proxy.get("local_address"))
                .and_then(scalar_string)
                .filter(|address| !address.is_empty())
        });
        match local_address {
            Some(address) => insert_str(&mut desired, "local_address", &address),
            None => errors.push("local_address is required when proxy_group is set"),
        }
        let port = params
            .local_port
            .value()
            .map(String::as_str)
            .unwrap_or(DEFAULT_PORT);
        insert_str(&mut desired, "local_port", port);
    } else {
        if let Field::Value(address) = &params.local_address {
            insert_str(&mut desired, "local_address", address);
        }
        if let Field::Value(port) = &params.local_port {
            insert_str(&mut desired, "local_port", port);
        }
    }

    errors.into_result()?;

    match &params.proxy_group {
        Field::Value(group) => {
            let id = resolve_one(api, resolve::PROXY_GROUPS, group).await?;
            insert_str(&mut desired, "proxy_groupid", &id);
        }
        Field::Clear => insert_str(&mut desired, "proxy_groupid", "0"),
        Field::Unset => {}
    }

    debug!("Generated {} field(s) for proxy {}", desired.len(), params.name);
    Ok(desired)
}

/// Active proxy: the server accepts its connections. Returns whether PSK was
/// selected, when TLS was given at all.
fn active_settings(
    desired: &mut Map<String, Value>,
    capabilities: &ApiCapabilities,
    params: &ProxyParams,
    errors: &mut ValidationErrors,
) -> Option<bool> {
    if params.interface.is_set() {
        errors.push("interface is only used by passive proxies");
    }
    if params.tls_connect.is_set() {
        errors.push("tls_connect is only used by passive proxies, use tls_accept");
    }

    match &params.allowed_addresses {
        Field::Value(addresses) => insert_str(desired, capabilities.proxy_address_field, addresses),
        Field::Clear => insert_str(desired, capabilities.proxy_address_field, ""),
        Field::Unset => {}
    }

    insert_str(desired, "tls_connect", UNENCRYPTED);
    match tls::tls_accept_field(&params.tls_accept) {
        Ok(Some(mask)) => {
            insert_str(desired, "tls_accept", &mask);
            Some(tls::mask_has_psk(&mask))
        }
        Ok(None) => None,
        Err(problems) => {
            errors.extend(problems);
            None
        }
    }
}

/// Passive proxy: the server connects to it through its interface.
fn passive_settings(
    desired: &mut Map<String, Value>,
    capabilities: &ApiCapabilities,
    params: &ProxyParams,
    existing: Option<&Value>,
    errors: &mut ValidationErrors,
) -> Option<bool> {
    if params.allowed_addresses.is_set() {
        errors.push("allowed_addresses is only used by active proxies");
    }
    if params.tls_accept.is_set() {
        errors.push("tls_accept is only used by active proxies, use tls_connect");
    }

    let interface = match &params.interface {
        Field::Value(interface) => Some(interface.clone()),
        Field::Clear => Some(ProxyInterfaceParam::default()),
        Field::Unset if existing.is_none() => Some(ProxyInterfaceParam::default()),
        Field::Unset => None,
    };
    if let Some(interface) = interface {
        passive_interface(desired, capabilities, &interface, errors);
    }

    insert_str(desired, "tls_accept", UNENCRYPTED);
    match tls::tls_connect_field(&params.tls_connect) {
        Ok(Some(mode)) => {
            insert_str(desired, "tls_connect", &mode);
            Some(tls::mask_has_psk(&mode))
        }
        Ok(None) => None,
        Err(problems) => {
            errors.extend(problems);
            None
        }
    }
}

fn passive_interface(
    desired: &mut Map<String, Value>,
    capabilities: &ApiCapabilities,
    interface: &ProxyInterfaceParam,
    errors: &mut ValidationErrors,
) {
    let port = interface
        .port
        .as_ref()
        .and_then(scalar_string)
        .filter(|port| !port.is_empty())
        .unwrap_or_else(|| DEFAULT_PORT.to_string());
    let address = interface
        .address
        .clone()
        .filter(|address| !address.is_empty());

    if capabilities.supports_proxy_groups {
        let address = address
            .or_else(|| interface.dns.clone().filter(|dns| !dns.is_empty()))
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());
        insert_str(desired, "address", &address);
        insert_str(desired, "port", &port);
        return;
    }

    let useip = interface.useip.as_deref().unwrap_or("ip");
    let useip_code = INTERFACE_USEIP.get(useip).copied().unwrap_or("1");
    let dns = interface.dns.clone().unwrap_or_default();
    if useip == "dns" && dns.is_empty() {
        errors.push("interface dns is required when useip is dns");
    }
    let ip = match address {
        Some(ip) => ip,
        None if useip == "ip" => DEFAULT_ADDRESS.to_string(),
        None => String::new(),
    };

    desired.insert(
        "interface".to_string(),
        json!({"useip": useip_code, "ip": ip, "dns": dns, "port": port}),
    );
}

fn insert_str(desired: &mut Map<String, Value>, key: &str, value: &str) {
    desired.insert(key.to_string(), Value::String(value.to_string()));
}
