//! HTTP transport for the Zabbix JSON-RPC API

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, ClientBuilder};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::api::envelope::{requires_auth, RpcRequest, RpcResponse};
use crate::api::error::ApiError;
use crate::config::ConnectionConfig;
use crate::version::{ApiCapabilities, ZabbixVersion};

/// Anything that can answer a JSON-RPC method call.
#[async_trait]
pub trait ZabbixApi: Send + Sync {
    async fn call(&self, method: &str, params: Value) -> Result<Value, ApiError>;
}

/// Query `apiinfo.version` and parse the answer.
pub async fn api_version(api: &dyn ZabbixApi) -> Result<ZabbixVersion, ApiError> {
    let result = api.call("apiinfo.version", json!([])).await?;
    let raw = result.as_str().ok_or_else(|| ApiError::InvalidResponse {
        reason: format!("apiinfo.version returned {result}"),
    })?;

    ZabbixVersion::parse(raw).map_err(|e| ApiError::InvalidResponse {
        reason: e.to_string(),
    })
}

#[derive(Debug, Clone)]
enum Credential {
    Token(String),
    Session(String),
}

impl Credential {
    fn secret(&self) -> &str {
        match self {
            Credential::Token(token) | Credential::Session(token) => token,
        }
    }
}

pub struct ZabbixClient {
    http: Client,
    endpoint: Url,
    http_basic: Option<(String, String)>,
    credential: Option<Credential>,
    capabilities: ApiCapabilities,
}

impl ZabbixClient {
    /// Build the transport without talking to the server.
    pub fn new(config: &ConnectionConfig) -> Result<Self, ApiError> {
        let endpoint = config.endpoint()?;

        let mut builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(concat!("rustle-zabbix/", env!("CARGO_PKG_VERSION")));

        if !config.validate_certs {
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }

        let http = builder.build()?;

        Ok(Self {
            http,
            endpoint,
            http_basic: config.http_basic(),
            credential: None,
            capabilities: ApiCapabilities::for_version(&ZabbixVersion::new(vec![0])),
        })
    }

    /// Build the transport, discover the API version and authenticate.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, ApiError> {
        config.validate()?;

        let mut client = Self::new(config)?;
        let version = api_version(&client).await?;
        info!("Connected to Zabbix API {} at {}", version, client.endpoint);
        client.capabilities = ApiCapabilities::for_version(&version);

        if let Some(token) = &config.auth_token {
            client.credential = Some(Credential::Token(token.clone()));
        } else if let (Some(username), Some(password)) = (&config.username, &config.password) {
            client.login(username, password).await?;
        }

        Ok(client)
    }

    pub fn capabilities(&self) -> &ApiCapabilities {
        &self.capabilities
    }

    pub fn version(&self) -> &ZabbixVersion {
        &self.capabilities.version
    }

    async fn login(&mut self, username: &str, password: &str) -> Result<(), ApiError> {
        let mut params = serde_json::Map::new();
        params.insert(
            self.capabilities.login_user_field.to_string(),
            Value::String(username.to_string()),
        );
        params.insert("password".to_string(), Value::String(password.to_string()));

        let result = self.call("user.login", Value::Object(params)).await?;
        let session = result.as_str().ok_or_else(|| ApiError::InvalidResponse {
            reason: "user.login did not return a session id".to_string(),
        })?;

        debug!("Logged in as {}", username);
        self.credential = Some(Credential::Session(session.to_string()));
        Ok(())
    }

    /// End the session if one was opened by `user.login`. API tokens are left alone.
    pub async fn logout(mut self) -> Result<(), ApiError> {
        if let Some(Credential::Session(_)) = &self.credential {
            self.call("user.logout", json!([])).await?;
            self.credential = None;
            debug!("Logged out");
        }
        Ok(())
    }
}

#[async_trait]
impl ZabbixApi for ZabbixClient {
    async fn call(&self, method: &str, params: Value) -> Result<Value, ApiError> {
        let mut request = RpcRequest::new(method, params);
        let mut builder = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json-rpc");

        if let Some((user, password)) = &self.http_basic {
            builder = builder.basic_auth(user, Some(password));
        }

        if let Some(credential) = &self.credential {
            if requires_auth(method) {
                // Basic auth already owns the Authorization header.
                if self.capabilities.bearer_auth_header && self.http_basic.is_none() {
                    builder = builder.bearer_auth(credential.secret());
                } else {
                    request = request.with_auth(credential.secret());
                }
            }
        }

        debug!(method = method, id = %request.id, "Sending JSON-RPC request");
        let response = builder.json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("{} returned HTTP {}", method, status);
            return Err(ApiError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: RpcResponse = serde_json::from_str(&body)?;
        parsed.into_result(method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_url() {
        let config = ConnectionConfig::default();
        assert!(matches!(
            ZabbixClient::new(&config),
            Err(ApiError::Configuration(_))
        ));
    }

    #[test]
    fn test_new_uses_endpoint() {
        let config = ConnectionConfig {
            url: Some("https://zabbix.example.com/".to_string()),
            auth_token: Some("abc".to_string()),
            ..Default::default()
        };
        let client = ZabbixClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint.as_str(),
            "https://zabbix.example.com/api_jsonrpc.php"
        );
        assert!(client.credential.is_none());
    }

    #[test]
    fn test_credential_secret() {
        assert_eq!(Credential::Token("t".to_string()).secret(), "t");
        assert_eq!(Credential::Session("s".to_string()).secret(), "s");
    }
}
