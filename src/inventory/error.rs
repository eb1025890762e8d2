use thiserror::Error;

use crate::api::ApiError;
use crate::modules::ReconcileError;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Invalid inventory source {path}: {reason}")]
    Config { path: String, reason: String },

    #[error("Invalid filter: {}", errors.join("; "))]
    InvalidFilter { errors: Vec<String> },

    #[error("{kind} not found in Zabbix: {}", names.join(", "))]
    NotFound { kind: String, names: Vec<String> },

    #[error("Zabbix API error: {message}")]
    Api { message: String },

    #[error("Inventory cache error: {reason}")]
    Cache { reason: String },

    #[error("Unknown host: {host}")]
    UnknownHost { host: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<ApiError> for InventoryError {
    fn from(err: ApiError) -> Self {
        InventoryError::Api {
            message: err.to_string(),
        }
    }
}

impl From<ReconcileError> for InventoryError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::NotFound { kind, names } => InventoryError::NotFound { kind, names },
            ReconcileError::Validation { errors } => InventoryError::InvalidFilter { errors },
            other => InventoryError::Api {
                message: other.to_string(),
            },
        }
    }
}
