use thiserror::Error;

use crate::api::ApiError;

/// Errors that can occur while reconciling a Zabbix resource
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("{}", errors.join("; "))]
    Validation { errors: Vec<String> },

    #[error("{kind} not found in Zabbix: {}", names.join(", "))]
    NotFound { kind: String, names: Vec<String> },

    #[error("Zabbix API error: {message}")]
    RemoteApi { message: String },

    #[error("Connection error: {message}")]
    Transport { message: String },

    #[error("Unsupported remote state: {reason}")]
    Conflict { reason: String },

    #[error("Module not found: {name}")]
    ModuleNotFound { name: String },
}

impl ReconcileError {
    pub fn validation(message: impl Into<String>) -> Self {
        ReconcileError::Validation {
            errors: vec![message.into()],
        }
    }

    pub fn not_found(kind: &str, names: Vec<String>) -> Self {
        ReconcileError::NotFound {
            kind: kind.to_string(),
            names,
        }
    }
}

impl From<ApiError> for ReconcileError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Remote { .. } | ApiError::InvalidResponse { .. } => ReconcileError::RemoteApi {
                message: err.to_string(),
            },
            ApiError::Transport(_) | ApiError::HttpStatus { .. } | ApiError::Configuration(_) => {
                ReconcileError::Transport {
                    message: err.to_string(),
                }
            }
        }
    }
}

impl From<serde_json::Error> for ReconcileError {
    fn from(err: serde_json::Error) -> Self {
        ReconcileError::Validation {
            errors: vec![format!("Invalid arguments: {err}")],
        }
    }
}

/// Collects every validation problem before failing, so the caller sees all
/// offending fields at once.
#[derive(Debug, Default)]
pub struct ValidationErrors {
    errors: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), ReconcileError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ReconcileError::Validation {
                errors: self.errors,
            })
        }
    }
}
