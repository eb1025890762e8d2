//! TLS settings shared by hosts and proxies

use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::modules::error::ValidationErrors;
use crate::modules::field::{scalar_string, Field};
use crate::modules::tables::{self, TLS_TYPE};

pub const UNENCRYPTED: &str = "1";
const PSK_BIT: u32 = 2;

/// Sum the selected encryption modes into the `tls_accept` bitmask.
/// An empty selection means unencrypted only.
pub fn tls_accept_mask(selected: &[String]) -> Result<String, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let unique: BTreeSet<&str> = selected.iter().map(String::as_str).collect();

    let mut mask = 0u32;
    for mode in unique {
        match TLS_TYPE.get(mode) {
            Some(code) => mask += code.parse::<u32>().unwrap_or(0),
            None => tables::check_choice(&mut errors, &TLS_TYPE, "tls_accept", mode),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    if mask == 0 {
        mask = 1;
    }
    Ok(mask.to_string())
}

/// `None` when the option was not given.
pub fn tls_accept_field(field: &Field<Vec<String>>) -> Result<Option<String>, ValidationErrors> {
    match field {
        Field::Unset => Ok(None),
        Field::Clear => Ok(Some(UNENCRYPTED.to_string())),
        Field::Value(selected) => tls_accept_mask(selected).map(Some),
    }
}

pub fn tls_connect_field(field: &Field<String>) -> Result<Option<String>, ValidationErrors> {
    match field {
        Field::Unset => Ok(None),
        Field::Clear => Ok(Some(UNENCRYPTED.to_string())),
        Field::Value(mode) => {
            let mut errors = ValidationErrors::new();
            match TLS_TYPE.get(mode.as_str()) {
                Some(code) => Ok(Some(code.to_string())),
                None => {
                    tables::check_choice(&mut errors, &TLS_TYPE, "tls_connect", mode);
                    Err(errors)
                }
            }
        }
    }
}

pub fn mask_has_psk(code: &str) -> bool {
    code.parse::<u32>().map(|mask| mask & PSK_BIT != 0).unwrap_or(false)
}

/// Whether the remote object already has PSK enabled in either direction.
pub fn existing_uses_psk(existing: Option<&Value>) -> bool {
    let Some(existing) = existing else {
        return false;
    };

    ["tls_accept", "tls_connect"].iter().any(|key| {
        existing
            .get(*key)
            .and_then(scalar_string)
            .map(|code| mask_has_psk(&code))
            .unwrap_or(false)
    })
}

/// PSK identity and key as given in the task.
#[derive(Debug, Clone, Copy)]
pub struct PskInput<'a> {
    pub identity: &'a Field<String>,
    pub psk: &'a Field<String>,
}

/// Apply the PSK pair to `desired`.
///
/// The API never returns the key, so a given pair is always written. The pair
/// is required when PSK is selected, unless the remote object already uses
/// PSK and therefore already holds a key.
pub fn apply_psk(
    desired: &mut Map<String, Value>,
    input: PskInput<'_>,
    psk_selected: Option<bool>,
    existing_psk: bool,
    errors: &mut ValidationErrors,
) {
    let identity = input.identity.value();
    let psk = input.psk.value();

    match (identity, psk) {
        (Some(_), None) | (None, Some(_)) => {
            errors.push("tls_psk_identity and tls_psk must be given together");
            return;
        }
        _ => {}
    }

    let psk_effective = psk_selected.unwrap_or(existing_psk);

    match (identity, psk) {
        (Some(identity), Some(psk)) => {
            if !psk_effective {
                errors.push("tls_psk_identity and tls_psk require PSK in tls_accept or tls_connect");
                return;
            }
            desired.insert(
                "tls_psk_identity".to_string(),
                Value::String(identity.clone()),
            );
            desired.insert("tls_psk".to_string(), Value::String(psk.clone()));
        }
        _ => {
            if psk_effective && !existing_psk {
                errors.push("tls_psk_identity and tls_psk are required when PSK encryption is used");
            }
        }
    }
}
