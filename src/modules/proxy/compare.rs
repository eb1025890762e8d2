//! Compare a desired proxy against the object returned by `proxy.get`

use serde_json::{Map, Value};

use crate::modules::compare::{diff_scalars, nested_differs};
use crate::modules::tables::PROXY_TIMEOUT_TYPES;

const PROXY_SCALARS: &[&str] = &[
    "name",
    "host",
    "operating_mode",
    "status",
    "description",
    "allowed_addresses",
    "proxy_address",
    "address",
    "port",
    "proxy_groupid",
    "local_address",
    "local_port",
    "tls_connect",
    "tls_accept",
    "tls_issuer",
    "tls_subject",
    "custom_timeouts",
];

/// Produce the minimal update for `existing`. An empty map means in sync.
pub fn compare_proxy(existing: &Value, desired: &Map<String, Value>) -> Map<String, Value> {
    let mut diff = Map::new();

    diff_scalars(existing, desired, PROXY_SCALARS, &mut diff);

    let timeout_fields: Vec<String> = PROXY_TIMEOUT_TYPES
        .iter()
        .map(|kind| format!("timeout_{kind}"))
        .collect();
    let timeout_fields: Vec<&str> = timeout_fields.iter().map(String::as_str).collect();
    diff_scalars(existing, desired, &timeout_fields, &mut diff);

    for field in ["tls_psk_identity", "tls_psk"] {
        if let Some(value) = desired.get(field) {
            diff.insert(field.to_string(), value.clone());
        }
    }

    // Pre-7.0 passive proxies carry a nested interface object.
    if let Some(interface) = desired.get("interface") {
        if nested_differs(existing.get("interface"), interface) {
            diff.insert("interface".to_string(), interface.clone());
        }
    }

    diff
}
