//! JSON-RPC 2.0 request and response envelopes

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::error::ApiError;

pub const JSONRPC_VERSION: &str = "2.0";

/// Methods the API accepts without an auth token.
const UNAUTHENTICATED_METHODS: &[&str] = &["apiinfo.version", "user.login"];

pub fn requires_auth(method: &str) -> bool {
    !UNAUTHENTICATED_METHODS.contains(&method)
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: &'static str,
    pub method: String,
    pub id: String,
    pub params: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            id: uuid::Uuid::new_v4().to_string(),
            params,
            auth: None,
        }
    }

    /// Attach a token or session id. Object params carry it as `params.auth`;
    /// list params have nowhere to put it, so it rides on the envelope.
    pub fn with_auth(mut self, token: &str) -> Self {
        if !requires_auth(&self.method) {
            return self;
        }

        match &mut self.params {
            Value::Object(map) => {
                map.insert("auth".to_string(), Value::String(token.to_string()));
            }
            _ => self.auth = Some(token.to_string()),
        }
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorBody {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
    #[serde(default)]
    pub id: Option<Value>,
}

impl RpcResponse {
    /// An `error` member always wins, even if a `result` is present too.
    pub fn into_result(self, method: &str) -> Result<Value, ApiError> {
        if let Some(error) = self.error {
            return Err(ApiError::Remote {
                method: method.to_string(),
                message: error.message,
                data: error.data,
            });
        }

        self.result.ok_or_else(|| ApiError::InvalidResponse {
            reason: format!("response to {method} has neither result nor error"),
        })
    }
}
