//! Static translation tables between option values and Zabbix API codes

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::modules::error::{ReconcileError, ValidationErrors};

pub type CodeTable = Lazy<HashMap<&'static str, &'static str>>;

fn table(entries: &[(&'static str, &'static str)]) -> HashMap<&'static str, &'static str> {
    entries.iter().copied().collect()
}

pub static HOST_STATUS: CodeTable = Lazy::new(|| table(&[("enabled", "0"), ("disabled", "1")]));

pub static IPMI_AUTHTYPE: CodeTable = Lazy::new(|| {
    table(&[
        ("default", "-1"),
        ("none", "0"),
        ("md2", "1"),
        ("md5", "2"),
        ("straight", "4"),
        ("oem", "5"),
        ("rmcp+", "6"),
    ])
});

pub static IPMI_PRIVILEGE: CodeTable = Lazy::new(|| {
    table(&[
        ("callback", "1"),
        ("user", "2"),
        ("operator", "3"),
        ("admin", "4"),
        ("oem", "5"),
    ])
});

pub static INVENTORY_MODE: CodeTable =
    Lazy::new(|| table(&[("disabled", "-1"), ("manual", "0"), ("automatic", "1")]));

/// Encryption modes; `tls_accept` sums these as a bitmask.
pub static TLS_TYPE: CodeTable =
    Lazy::new(|| table(&[("unencrypted", "1"), ("psk", "2"), ("cert", "4")]));

pub static MACRO_TYPE: CodeTable =
    Lazy::new(|| table(&[("text", "0"), ("secret", "1"), ("vault_secret", "2")]));

pub static INTERFACE_TYPE: CodeTable =
    Lazy::new(|| table(&[("agent", "1"), ("snmp", "2"), ("ipmi", "3"), ("jmx", "4")]));

pub static INTERFACE_USEIP: CodeTable = Lazy::new(|| table(&[("dns", "0"), ("ip", "1")]));

pub static SNMP_VERSION: CodeTable = Lazy::new(|| table(&[("1", "1"), ("2", "2"), ("3", "3")]));

pub static SNMP_SECURITY_LEVEL: CodeTable = Lazy::new(|| {
    table(&[
        ("noAuthNoPriv", "0"),
        ("authNoPriv", "1"),
        ("authPriv", "2"),
    ])
});

pub static SNMP_AUTH_PROTOCOL: CodeTable = Lazy::new(|| {
    table(&[
        ("md5", "0"),
        ("sha1", "1"),
        ("sha224", "2"),
        ("sha256", "3"),
        ("sha384", "4"),
        ("sha512", "5"),
    ])
});

pub static SNMP_PRIV_PROTOCOL: CodeTable = Lazy::new(|| {
    table(&[
        ("des", "0"),
        ("aes128", "1"),
        ("aes192", "2"),
        ("aes256", "3"),
        ("aes192c", "4"),
        ("aes256c", "5"),
    ])
});

/// Proxy `operating_mode` codes; pre-7.0 `status` codes come from `ApiCapabilities`.
pub static PROXY_MODE: CodeTable = Lazy::new(|| table(&[("active", "0"), ("passive", "1")]));

/// Default ports per interface type
pub static INTERFACE_DEFAULT_PORT: CodeTable = Lazy::new(|| {
    table(&[
        ("agent", "10050"),
        ("snmp", "161"),
        ("ipmi", "623"),
        ("jmx", "12345"),
    ])
});

/// Item types a proxy can override the timeout for (`timeout_<type>`).
pub const PROXY_TIMEOUT_TYPES: &[&str] = &[
    "zabbix_agent",
    "simple_check",
    "snmp_agent",
    "external_check",
    "db_monitor",
    "http_agent",
    "ssh_agent",
    "telnet_agent",
    "script",
    "browser",
];

/// Host inventory fields in Zabbix field-number order (field 1 is `type`).
pub const INVENTORY_FIELDS: &[&str] = &[
    "type",
    "type_full",
    "name",
    "alias",
    "os",
    "os_full",
    "os_short",
    "serialno_a",
    "serialno_b",
    "tag",
    "asset_tag",
    "macaddress_a",
    "macaddress_b",
    "hardware",
    "hardware_full",
    "software",
    "software_full",
    "software_app_a",
    "software_app_b",
    "software_app_c",
    "software_app_d",
    "software_app_e",
    "contact",
    "location",
    "location_lat",
    "location_lon",
    "notes",
    "chassis",
    "model",
    "hw_arch",
    "vendor",
    "contract_number",
    "installer_name",
    "deployment_status",
    "url_a",
    "url_b",
    "url_c",
    "host_networks",
    "host_netmask",
    "host_router",
    "oob_ip",
    "oob_netmask",
    "oob_router",
    "date_hw_purchase",
    "date_hw_install",
    "date_hw_expiry",
    "date_hw_decomm",
    "site_address_a",
    "site_address_b",
    "site_address_c",
    "site_city",
    "site_state",
    "site_country",
    "site_zip",
    "site_rack",
    "site_notes",
    "poc_1_name",
    "poc_1_email",
    "poc_1_phone_a",
    "poc_1_phone_b",
    "poc_1_cell",
    "poc_1_screen",
    "poc_1_notes",
    "poc_2_name",
    "poc_2_email",
    "poc_2_phone_a",
    "poc_2_phone_b",
    "poc_2_cell",
    "poc_2_screen",
    "poc_2_notes",
];

/// Inventory field id to field name, e.g. `5 -> "os"`.
pub static INVENTORY_FIELD_BY_ID: Lazy<HashMap<u32, &'static str>> = Lazy::new(|| {
    INVENTORY_FIELDS
        .iter()
        .enumerate()
        .map(|(idx, name)| (idx as u32 + 1, *name))
        .collect()
});

pub static INVENTORY_ID_BY_FIELD: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    INVENTORY_FIELD_BY_ID
        .iter()
        .map(|(id, name)| (*name, *id))
        .collect()
});

pub fn is_inventory_field(name: &str) -> bool {
    INVENTORY_ID_BY_FIELD.contains_key(name)
}

/// Translate a choice to its API code.
pub fn code(table: &CodeTable, field: &str, value: &str) -> Result<&'static str, ReconcileError> {
    table
        .get(value)
        .copied()
        .ok_or_else(|| ReconcileError::validation(unknown_choice(table, field, value)))
}

/// Record an error for `value` unless it is one of the table's choices.
pub fn check_choice(errors: &mut ValidationErrors, table: &CodeTable, field: &str, value: &str) {
    if !table.contains_key(value) {
        errors.push(unknown_choice(table, field, value));
    }
}

/// Reverse lookup: API code to choice name.
pub fn name_for_code(table: &CodeTable, code: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(_, c)| **c == code)
        .map(|(name, _)| *name)
}

fn unknown_choice(table: &CodeTable, field: &str, value: &str) -> String {
    let mut choices: Vec<&str> = table.keys().copied().collect();
    choices.sort_unstable();
    format!(
        "value of {field} must be one of: {}, got: {value}",
        choices.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_lookup() {
        assert_eq!(code(&HOST_STATUS, "status", "disabled").unwrap(), "1");
        assert_eq!(code(&IPMI_AUTHTYPE, "ipmi_authtype", "rmcp+").unwrap(), "6");
        assert_eq!(code(&SNMP_PRIV_PROTOCOL, "privprotocol", "aes256c").unwrap(), "5");
    }

    #[test]
    fn test_unknown_choice_message() {
        let err = code(&TLS_TYPE, "tls_connect", "ssl").unwrap_err();
        assert_eq!(
            err.to_string(),
            "value of tls_connect must be one of: cert, psk, unencrypted, got: ssl"
        );
    }

    #[test]
    fn test_inventory_field_ids() {
        assert_eq!(INVENTORY_FIELDS.len(), 70);
        assert_eq!(INVENTORY_FIELD_BY_ID.get(&1), Some(&"type"));
        assert_eq!(INVENTORY_FIELD_BY_ID.get(&5), Some(&"os"));
        assert_eq!(INVENTORY_FIELD_BY_ID.get(&70), Some(&"poc_2_notes"));
        assert_eq!(INVENTORY_ID_BY_FIELD.get("serialno_a"), Some(&8));
        assert!(!is_inventory_field("color"));
    }

    #[test]
    fn test_reverse_lookup() {
        assert_eq!(name_for_code(&INTERFACE_TYPE, "2"), Some("snmp"));
        assert_eq!(name_for_code(&INTERFACE_TYPE, "9"), None);
    }
}
