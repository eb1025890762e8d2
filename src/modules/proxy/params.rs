//! Task parameters accepted by the proxy module

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::modules::error::{ReconcileError, ValidationErrors};
use crate::modules::field::Field;
use crate::modules::interface::State;
use crate::modules::tables::{self, INTERFACE_USEIP, PROXY_MODE, PROXY_TIMEOUT_TYPES, TLS_TYPE};
use crate::version::ApiCapabilities;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyParams {
    pub state: State,
    pub name: String,
    /// `active` or `passive`; inherited from the existing proxy when unset
    pub mode: Field<String>,
    pub description: Field<String>,
    pub allowed_addresses: Field<String>,
    pub interface: Field<ProxyInterfaceParam>,
    pub proxy_group: Field<String>,
    pub local_address: Field<String>,
    pub local_port: Field<String>,
    pub tls_accept: Field<Vec<String>>,
    pub tls_connect: Field<String>,
    pub tls_psk_identity: Field<String>,
    pub tls_psk: Field<String>,
    pub tls_issuer: Field<String>,
    pub tls_subject: Field<String>,
    pub custom_timeouts: Field<BTreeMap<String, String>>,
}

/// Where the server reaches a passive proxy.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyInterfaceParam {
    #[serde(alias = "ip")]
    pub address: Option<String>,
    pub dns: Option<String>,
    pub useip: Option<String>,
    pub port: Option<Value>,
}

impl ProxyParams {
    pub fn validate(&self, capabilities: Option<&ApiCapabilities>) -> Result<(), ReconcileError> {
        let mut errors = ValidationErrors::new();

        if self.name.trim().is_empty() {
            errors.push("name is required");
        }

        if self.state == State::Absent {
            return errors.into_result();
        }

        if let Field::Value(mode) = &self.mode {
            tables::check_choice(&mut errors, &PROXY_MODE, "mode", mode);
        }
        if let Field::Value(mode) = &self.tls_connect {
            tables::check_choice(&mut errors, &TLS_TYPE, "tls_connect", mode);
        }
        if let Field::Value(modes) = &self.tls_accept {
            for mode in modes {
                tables::check_choice(&mut errors, &TLS_TYPE, "tls_accept", mode);
            }
        }
        if let Field::Value(ProxyInterfaceParam { useip: Some(useip), .. }) = &self.interface {
            tables::check_choice(&mut errors, &INTERFACE_USEIP, "interface useip", useip);
        }

        if let Field::Value(timeouts) = &self.custom_timeouts {
            let unknown: Vec<&str> = timeouts
                .keys()
                .map(String::as_str)
                .filter(|kind| !PROXY_TIMEOUT_TYPES.contains(kind))
                .collect();
            if !unknown.is_empty() {
                errors.push(format!("Unknown custom_timeouts item types: {}", unknown.join(", ")));
            }
        }

        if let Some(capabilities) = capabilities {
            if !capabilities.supports_proxy_groups {
                let version = &capabilities.version;
                for (option, given) in [
                    ("proxy_group", self.proxy_group.is_set()),
                    ("local_address", self.local_address.is_set()),
                    ("local_port", self.local_port.is_set()),
                ] {
                    if given {
                        errors.push(format!("{option} is not supported by Zabbix {version}"));
                    }
                }
            }
            if self.custom_timeouts.is_set() && !capabilities.supports_custom_timeouts {
                errors.push(format!(
                    "custom_timeouts is not supported by Zabbix {}",
                    capabilities.version
                ));
            }
        }

        errors.into_result()
    }
}
