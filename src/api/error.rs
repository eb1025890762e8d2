use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("{method} failed: {message}{}", detail_suffix(.data))]
    Remote {
        method: String,
        message: String,
        data: Option<String>,
    },

    #[error("Invalid JSON-RPC response: {reason}")]
    InvalidResponse { reason: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Transport(format!("request timed out: {err}"))
        } else if err.is_connect() {
            ApiError::Transport(format!("connection failed: {err}"))
        } else if err.is_decode() {
            ApiError::InvalidResponse {
                reason: err.to_string(),
            }
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::InvalidResponse {
            reason: err.to_string(),
        }
    }
}

fn detail_suffix(data: &Option<String>) -> String {
    match data {
        Some(detail) if !detail.is_empty() => format!(" ({detail})"),
        _ => String::new(),
    }
}
