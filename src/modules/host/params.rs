//! Task parameters accepted by the host module

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::modules::error::{ReconcileError, ValidationErrors};
use crate::modules::field::Field;
use crate::modules::interface::State;
use crate::modules::tables::{
    self, HOST_STATUS, INTERFACE_TYPE, INTERFACE_USEIP, INVENTORY_MODE, IPMI_AUTHTYPE,
    IPMI_PRIVILEGE, MACRO_TYPE, TLS_TYPE,
};
use crate::version::ApiCapabilities;

static MACRO_NAME: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[A-Z0-9_.]+$").ok());

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostParams {
    pub state: State,
    /// Technical host name
    pub host: String,
    /// Visible name; cleared means "same as host"
    pub name: Field<String>,
    pub hostgroups: Field<Vec<String>>,
    pub templates: Field<Vec<String>>,
    pub status: Field<String>,
    pub description: Field<String>,
    pub proxy: Field<String>,
    pub proxy_group: Field<String>,
    pub tags: Field<Vec<TagParam>>,
    pub macros: Field<Vec<MacroParam>>,
    pub ipmi_authtype: Field<String>,
    pub ipmi_privilege: Field<String>,
    pub ipmi_username: Field<String>,
    pub ipmi_password: Field<String>,
    pub tls_accept: Field<Vec<String>>,
    pub tls_connect: Field<String>,
    pub tls_psk_identity: Field<String>,
    pub tls_psk: Field<String>,
    pub tls_issuer: Field<String>,
    pub tls_subject: Field<String>,
    pub inventory_mode: Field<String>,
    pub inventory: Field<BTreeMap<String, Value>>,
    pub interfaces: Field<Vec<InterfaceParam>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagParam {
    pub tag: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MacroParam {
    #[serde(rename = "macro")]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default = "default_macro_type")]
    pub macro_type: String,
}

fn default_macro_type() -> String {
    "text".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterfaceParam {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub useip: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub dns: Option<String>,
    #[serde(default)]
    pub port: Option<Value>,
    #[serde(default)]
    pub details: Option<BTreeMap<String, Value>>,
}

/// Normalise a user macro name: `test1` becomes `{$TEST1}` and
/// `{$disk:"/var"}` becomes `{$DISK:"/var"}`. Context keeps its case.
pub fn normalize_macro_name(raw: &str) -> Result<String, String> {
    let inner = raw
        .strip_prefix("{$")
        .and_then(|rest| rest.strip_suffix('}'))
        .unwrap_or(raw);

    let (name, context) = match inner.split_once(':') {
        Some((name, context)) => (name, Some(context)),
        None => (inner, None),
    };

    if name.chars().any(char::is_whitespace) {
        return Err(format!("Macro name '{raw}' must not contain spaces"));
    }

    let upper = name.to_uppercase();
    let pattern = MACRO_NAME
        .as_ref()
        .ok_or_else(|| "Macro name pattern failed to compile".to_string())?;
    if !pattern.is_match(&upper) {
        return Err(format!(
            "Macro name '{raw}' may only contain letters, digits, '_' and '.'"
        ));
    }

    Ok(match context {
        Some(context) => format!("{{${upper}:{context}}}"),
        None => format!("{{${upper}}}"),
    })
}

impl HostParams {
    /// Local checks that need no remote call. Version-dependent checks run
    /// only when capabilities are known. Every problem is reported.
    pub fn validate(&self, capabilities: Option<&ApiCapabilities>) -> Result<(), ReconcileError> {
        let mut errors = ValidationErrors::new();

        if self.host.trim().is_empty() {
            errors.push("host is required");
        }

        if self.state == State::Absent {
            return errors.into_result();
        }

        if let Field::Value(status) = &self.status {
            tables::check_choice(&mut errors, &HOST_STATUS, "status", status);
        }
        if let Field::Value(authtype) = &self.ipmi_authtype {
            tables::check_choice(&mut errors, &IPMI_AUTHTYPE, "ipmi_authtype", authtype);
        }
        if let Field::Value(privilege) = &self.ipmi_privilege {
            tables::check_choice(&mut errors, &IPMI_PRIVILEGE, "ipmi_privilege", privilege);
        }
        if let Field::Value(mode) = &self.tls_connect {
            tables::check_choice(&mut errors, &TLS_TYPE, "tls_connect", mode);
        }
        if let Field::Value(modes) = &self.tls_accept {
            for mode in modes {
                tables::check_choice(&mut errors, &TLS_TYPE, "tls_accept", mode);
            }
        }
        if let Field::Value(mode) = &self.inventory_mode {
            tables::check_choice(&mut errors, &INVENTORY_MODE, "inventory_mode", mode);
        }

        if self.hostgroups == Field::Clear {
            errors.push("hostgroups cannot be empty, a host must belong to at least one group");
        }

        if self.proxy.is_set() && self.proxy_group.is_set() {
            errors.push("proxy and proxy_group are mutually exclusive");
        }

        if let Field::Value(macros) = &self.macros {
            for item in macros {
                if let Err(message) = normalize_macro_name(&item.name) {
                    errors.push(message);
                }
                tables::check_choice(&mut errors, &MACRO_TYPE, "macro type", &item.macro_type);
            }
        }

        if let Field::Value(inventory) = &self.inventory {
            let unknown: Vec<&str> = inventory
                .keys()
                .filter(|field| !tables::is_inventory_field(field))
                .map(String::as_str)
                .collect();
            if !unknown.is_empty() {
                errors.push(format!("Unknown inventory fields: {}", unknown.join(", ")));
            }
            if matches!(&self.inventory_mode, Field::Value(mode) if mode == "disabled") {
                errors.push("inventory fields cannot be set when inventory_mode is disabled");
            }
        }

        if let Field::Value(interfaces) = &self.interfaces {
            self.validate_interface_choices(interfaces, &mut errors);
        }

        if let Some(capabilities) = capabilities {
            if self.proxy_group.is_set() && !capabilities.supports_proxy_groups {
                errors.push(format!(
                    "proxy_group is not supported by Zabbix {}",
                    capabilities.version
                ));
            }
        }

        errors.into_result()
    }

    fn validate_interface_choices(&self, interfaces: &[InterfaceParam], errors: &mut ValidationErrors) {
        let mut per_type: HashMap<&str, usize> = HashMap::new();
        for interface in interfaces {
            *per_type.entry(interface.kind.as_str()).or_default() += 1;
            tables::check_choice(errors, &INTERFACE_TYPE, "interface type", &interface.kind);
            if let Some(useip) = &interface.useip {
                tables::check_choice(errors, &INTERFACE_USEIP, "useip", useip);
            }
        }

        let mut duplicated: Vec<(&str, usize)> =
            per_type.into_iter().filter(|(_, count)| *count > 1).collect();
        duplicated.sort_unstable();
        for (kind, count) in duplicated {
            errors.push(format!(
                "Only one interface of each type is allowed: {count} interfaces with type '{kind}'"
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> HostParams {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_macro_name_normalization() {
        assert_eq!(normalize_macro_name("test1").unwrap(), "{$TEST1}");
        assert_eq!(normalize_macro_name("{$test1}").unwrap(), "{$TEST1}");
        assert_eq!(
            normalize_macro_name("{$disk.free:\"/var\"}").unwrap(),
            "{$DISK.FREE:\"/var\"}"
        );
        assert!(normalize_macro_name("test 1").is_err());
        assert!(normalize_macro_name("bad-name").is_err());
    }

    #[test]
    fn test_macro_pattern_is_reused() {
        assert!(MACRO_NAME.is_some());
        for name in ["a", "b.c", "{$D_E}"] {
            assert!(normalize_macro_name(name).is_ok());
        }
        assert!(normalize_macro_name("f/g").is_err());
    }

    #[test]
    fn test_two_agent_interfaces_rejected() {
        let p = params(json!({
            "host": "web01",
            "interfaces": [{"type": "agent"}, {"type": "agent", "ip": "10.0.0.2"}]
        }));
        let message = p.validate(None).unwrap_err().to_string();
        assert!(message.contains("2 interfaces with type 'agent'"), "{message}");
    }

    #[test]
    fn test_all_errors_reported() {
        let p = params(json!({
            "host": "web01",
            "status": "paused",
            "proxy": "p1",
            "proxy_group": "g1",
            "inventory": {"os": "Linux", "colour": "red", "shoe": "9"}
        }));
        match p.validate(None).unwrap_err() {
            ReconcileError::Validation { errors } => {
                assert_eq!(errors.len(), 3);
                assert!(errors.iter().any(|e| e.contains("colour, shoe")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_proxy_group_gated_by_version() {
        let p = params(json!({"host": "web01", "proxy_group": "g1"}));
        let old = ApiCapabilities::for_version(&"6.0".parse().unwrap());
        assert!(p.validate(Some(&old)).is_err());
        let new = ApiCapabilities::for_version(&"7.0".parse().unwrap());
        assert!(p.validate(Some(&new)).is_ok());
    }

    #[test]
    fn test_absent_needs_only_host() {
        let p = params(json!({"host": "web01", "state": "absent", "status": "bogus"}));
        assert!(p.validate(None).is_ok());
    }

    #[test]
    fn test_unknown_option_rejected() {
        let result: Result<HostParams, _> =
            serde_json::from_value(json!({"host": "web01", "colour": "red"}));
        assert!(result.is_err());
    }
}
