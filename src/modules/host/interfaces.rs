//! Host interface construction and SNMP details validation

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use crate::modules::error::{ReconcileError, ValidationErrors};
use crate::modules::field::scalar_string;
use crate::modules::host::params::InterfaceParam;
use crate::modules::tables::{
    INTERFACE_DEFAULT_PORT, INTERFACE_TYPE, INTERFACE_USEIP, SNMP_AUTH_PROTOCOL,
    SNMP_PRIV_PROTOCOL, SNMP_SECURITY_LEVEL, SNMP_VERSION,
};
use crate::version::ApiCapabilities;

const DEFAULT_IP: &str = "127.0.0.1";

/// Defaults applied to SNMP details before the allow-list check.
const SNMP_DEFAULTS: &[(&str, &str)] = &[
    ("bulk", "1"),
    ("contextname", ""),
    ("securitylevel", "noAuthNoPriv"),
    ("authprotocol", "md5"),
    ("privprotocol", "des"),
    ("max_repetitions", "10"),
];

/// SNMP detail fields permitted for a version and security level.
pub fn snmp_allowed_fields(
    version: &str,
    security_level: &str,
    capabilities: &ApiCapabilities,
) -> Vec<&'static str> {
    let mut allowed = vec!["version", "bulk"];

    match version {
        "3" => {
            allowed.extend(["securityname", "contextname", "securitylevel"]);
            match security_level {
                "authNoPriv" => allowed.extend(["authprotocol", "authpassphrase"]),
                "authPriv" => allowed.extend([
                    "authprotocol",
                    "authpassphrase",
                    "privprotocol",
                    "privpassphrase",
                ]),
                _ => {}
            }
        }
        _ => allowed.push("community"),
    }

    if version != "1" && capabilities.supports_snmp_max_repetitions {
        allowed.push("max_repetitions");
    }

    allowed
}

/// Validate SNMP details against the allow-list and translate them to API codes.
pub fn build_snmp_details(
    raw: Option<&BTreeMap<String, Value>>,
    capabilities: &ApiCapabilities,
) -> Result<Map<String, Value>, Vec<String>> {
    let Some(raw) = raw else {
        return Err(vec!["details are required for an snmp interface".to_string()]);
    };

    let given: BTreeMap<&str, String> = raw
        .iter()
        .filter_map(|(key, value)| scalar_string(value).map(|v| (key.as_str(), v)))
        .collect();

    let mut errors = Vec::new();

    let version = match given.get("version").map(String::as_str) {
        Some("2c") | None => "2".to_string(),
        Some(version) => version.to_string(),
    };
    if !SNMP_VERSION.contains_key(version.as_str()) {
        return Err(vec![format!("Unsupported SNMP version: {version}")]);
    }

    let level = given
        .get("securitylevel")
        .cloned()
        .unwrap_or_else(|| "noAuthNoPriv".to_string());
    let allowed = snmp_allowed_fields(&version, &level, capabilities);

    let unexpected: Vec<&str> = given
        .keys()
        .copied()
        .filter(|key| !allowed.iter().any(|field| field == key))
        .collect();
    if !unexpected.is_empty() {
        errors.push(format!(
            "SNMP details not allowed for version {version} with security level {level}: {}",
            unexpected.join(", ")
        ));
    }

    let mut merged: BTreeMap<&str, String> = BTreeMap::new();
    for field in &allowed {
        if let Some(value) = given.get(field) {
            merged.insert(*field, value.clone());
        } else if let Some((_, default)) = SNMP_DEFAULTS.iter().find(|(name, _)| name == field) {
            merged.insert(*field, default.to_string());
        }
    }
    merged.insert("version", version.clone());

    let missing: Vec<&str> = allowed
        .iter()
        .filter(|field| !merged.contains_key(*field))
        .copied()
        .collect();
    if !missing.is_empty() {
        errors.push(format!(
            "SNMP details missing for version {version} with security level {level}: {}",
            missing.join(", ")
        ));
    }

    let translations = [
        ("securitylevel", &SNMP_SECURITY_LEVEL),
        ("authprotocol", &SNMP_AUTH_PROTOCOL),
        ("privprotocol", &SNMP_PRIV_PROTOCOL),
    ];
    let mut details = Map::new();
    for (field, value) in merged {
        let translated = match translations.iter().find(|(name, _)| *name == field) {
            Some((_, table)) => match table.get(value.as_str()) {
                Some(code) => code.to_string(),
                None => {
                    errors.push(format!("Invalid value for SNMP {field}: {value}"));
                    continue;
                }
            },
            None if field == "bulk" => match value.as_str() {
                "1" | "true" => "1".to_string(),
                "0" | "false" => "0".to_string(),
                _ => {
                    errors.push(format!("Invalid value for SNMP bulk: {value}"));
                    continue;
                }
            },
            None => value,
        };
        details.insert(field.to_string(), Value::String(translated));
    }

    if errors.is_empty() {
        Ok(details)
    } else {
        Err(errors)
    }
}

/// Build the API interface list. Fails before any remote call when a type
/// appears more than once or any interface is invalid.
pub fn build_interfaces(
    interfaces: &[InterfaceParam],
    capabilities: &ApiCapabilities,
) -> Result<Vec<Value>, ReconcileError> {
    let mut errors = ValidationErrors::new();

    let mut per_type: HashMap<&str, usize> = HashMap::new();
    for interface in interfaces {
        *per_type.entry(interface.kind.as_str()).or_default() += 1;
    }
    let mut duplicated: Vec<(&str, usize)> =
        per_type.into_iter().filter(|(_, count)| *count > 1).collect();
    if !duplicated.is_empty() {
        duplicated.sort_unstable();
        for (kind, count) in duplicated {
            errors.push(format!(
                "Only one interface of each type is allowed: {count} interfaces with type '{kind}'"
            ));
        }
        return errors.into_result().map(|_| Vec::new());
    }

    let mut built = Vec::with_capacity(interfaces.len());
    for interface in interfaces {
        match build_interface(interface, capabilities) {
            Ok(value) => built.push(value),
            Err(problems) => problems.into_iter().for_each(|p| errors.push(p)),
        }
    }

    errors.into_result()?;
    Ok(built)
}

fn build_interface(
    interface: &InterfaceParam,
    capabilities: &ApiCapabilities,
) -> Result<Value, Vec<String>> {
    let kind = interface.kind.as_str();
    let mut problems = Vec::new();

    let type_code = INTERFACE_TYPE
        .get(kind)
        .copied()
        .ok_or_else(|| vec![format!("Invalid interface type: {kind}")])?;

    let useip = interface.useip.as_deref().unwrap_or("ip");
    let useip_code = match INTERFACE_USEIP.get(useip) {
        Some(code) => *code,
        None => {
            problems.push(format!("Invalid useip for {kind} interface: {useip}"));
            "1"
        }
    };

    let dns = interface.dns.clone().unwrap_or_default();
    let ip = match interface.ip.clone().filter(|ip| !ip.is_empty()) {
        Some(ip) => ip,
        None if useip == "ip" => DEFAULT_IP.to_string(),
        None => String::new(),
    };
    if useip == "dns" && dns.is_empty() {
        problems.push(format!("dns is required for {kind} interface when useip is dns"));
    }

    let port = interface
        .port
        .as_ref()
        .and_then(scalar_string)
        .filter(|p| !p.is_empty())
        .or_else(|| INTERFACE_DEFAULT_PORT.get(kind).map(|p| p.to_string()))
        .unwrap_or_default();

    let mut object = Map::new();
    object.insert("type".to_string(), Value::String(type_code.to_string()));
    object.insert("main".to_string(), Value::String("1".to_string()));
    object.insert("useip".to_string(), Value::String(useip_code.to_string()));
    object.insert("ip".to_string(), Value::String(ip));
    object.insert("dns".to_string(), Value::String(dns));
    object.insert("port".to_string(), Value::String(port));

    if kind == "snmp" {
        match build_snmp_details(interface.details.as_ref(), capabilities) {
            Ok(details) => {
                object.insert("details".to_string(), Value::Object(details));
            }
            Err(errors) => problems.extend(errors),
        }
    } else if interface.details.as_ref().is_some_and(|d| !d.is_empty()) {
        problems.push(format!("details are only supported for snmp interfaces, not {kind}"));
    }

    if problems.is_empty() {
        Ok(Value::Object(object))
    } else {
        Err(problems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn caps(version: &str) -> ApiCapabilities {
        ApiCapabilities::for_version(&version.parse().unwrap())
    }

    fn interface(value: Value) -> InterfaceParam {
        serde_json::from_value(value).unwrap()
    }

    fn details(value: Value) -> BTreeMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_agent_defaults() {
        let built = build_interfaces(&[interface(json!({"type": "agent"}))], &caps("7.0")).unwrap();
        assert_eq!(
            built[0],
            json!({"type": "1", "main": "1", "useip": "1", "ip": "127.0.0.1", "dns": "", "port": "10050"})
        );
    }

    #[test]
    fn test_duplicate_type_fails_with_count() {
        let err = build_interfaces(
            &[
                interface(json!({"type": "agent"})),
                interface(json!({"type": "agent", "ip": "10.0.0.1"})),
                interface(json!({"type": "jmx"})),
            ],
            &caps("7.0"),
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("2 interfaces with type 'agent'"), "{message}");
    }

    #[test]
    fn test_dns_required_for_useip_dns() {
        let err = build_interfaces(
            &[interface(json!({"type": "ipmi", "useip": "dns"}))],
            &caps("7.0"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("dns is required"));
    }

    #[test]
    fn test_snmp_v2c_details() {
        let built = build_snmp_details(
            Some(&details(json!({"version": "2", "community": "{$SNMP_COMMUNITY}"}))),
            &caps("7.0"),
        )
        .unwrap();
        assert_eq!(
            Value::Object(built),
            json!({"version": "2", "bulk": "1", "community": "{$SNMP_COMMUNITY}", "max_repetitions": "10"})
        );
    }

    #[test]
    fn test_snmp_v3_auth_priv_translated() {
        let built = build_snmp_details(
            Some(&details(json!({
                "version": 3,
                "securityname": "zabbix",
                "securitylevel": "authPriv",
                "authprotocol": "sha256",
                "authpassphrase": "a",
                "privprotocol": "aes256",
                "privpassphrase": "p",
                "bulk": false
            }))),
            &caps("6.0"),
        )
        .unwrap();
        assert_eq!(built["securitylevel"], "2");
        assert_eq!(built["authprotocol"], "3");
        assert_eq!(built["privprotocol"], "3");
        assert_eq!(built["bulk"], "0");
        assert_eq!(built["contextname"], "");
        assert!(!built.contains_key("max_repetitions"));
    }

    #[test]
    fn test_snmp_lists_every_offending_field() {
        let errors = build_snmp_details(
            Some(&details(json!({
                "version": "2",
                "community": "public",
                "securityname": "x",
                "privpassphrase": "y"
            }))),
            &caps("7.0"),
        )
        .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("privpassphrase, securityname"), "{}", errors[0]);
    }

    #[test]
    fn test_snmp_missing_fields_listed() {
        let errors = build_snmp_details(
            Some(&details(json!({"version": "3", "securitylevel": "authPriv"}))),
            &caps("7.0"),
        )
        .unwrap_err();
        assert!(
            errors[0].contains("securityname, authpassphrase, privpassphrase"),
            "{}",
            errors[0]
        );
    }

    #[test]
    fn test_details_rejected_for_agent() {
        let err = build_interfaces(
            &[interface(json!({"type": "agent", "details": {"community": "x"}}))],
            &caps("7.0"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("only supported for snmp"));
    }
}
