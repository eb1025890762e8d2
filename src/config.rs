//! Connection settings for the Zabbix API

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use url::Url;

pub const ENV_API_TOKEN: &str = "ZABBIX_API_TOKEN";
pub const ENV_API_URL: &str = "ZABBIX_API_URL";
pub const DEFAULT_API_PATH: &str = "api_jsonrpc.php";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {error}")]
    Io { path: String, error: String },

    #[error("Invalid YAML in {path}: {error}")]
    InvalidYaml { path: String, error: String },

    #[error("Zabbix URL is not set (use url, --url or ZABBIX_API_URL)")]
    MissingUrl,

    #[error("Invalid Zabbix URL {url}: {error}")]
    InvalidUrl { url: String, error: String },

    #[error("No credentials: set auth_token (ZABBIX_API_TOKEN) or username and password")]
    MissingCredentials,

    #[error("{first} and {second} must be given together")]
    Incomplete { first: String, second: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Base URL of the Zabbix frontend, e.g. `https://zabbix.example.com/`
    pub url: Option<String>,
    pub api_path: String,
    pub auth_token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub http_login_user: Option<String>,
    pub http_login_password: Option<String>,
    pub validate_certs: bool,
    /// Request timeout in seconds
    pub timeout: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_path: DEFAULT_API_PATH.to_string(),
            auth_token: None,
            username: None,
            password: None,
            http_login_user: None,
            http_login_password: None,
            validate_certs: true,
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ConnectionConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::InvalidYaml {
            path: path.display().to_string(),
            error: e.to_string(),
        })
    }

    /// Fill unset url and token from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.url.is_none() {
            self.url = lookup(ENV_API_URL).filter(|v| !v.is_empty());
        }
        if self.auth_token.is_none() {
            self.auth_token = lookup(ENV_API_TOKEN).filter(|v| !v.is_empty());
        }
    }

    /// Values set in `other` take precedence.
    pub fn merge(&mut self, other: &ConnectionConfig) {
        fn pick(target: &mut Option<String>, source: &Option<String>) {
            if source.is_some() {
                target.clone_from(source);
            }
        }

        pick(&mut self.url, &other.url);
        pick(&mut self.auth_token, &other.auth_token);
        pick(&mut self.username, &other.username);
        pick(&mut self.password, &other.password);
        pick(&mut self.http_login_user, &other.http_login_user);
        pick(&mut self.http_login_password, &other.http_login_password);

        if other.api_path != DEFAULT_API_PATH {
            self.api_path.clone_from(&other.api_path);
        }
        if !other.validate_certs {
            self.validate_certs = false;
        }
        if other.timeout != DEFAULT_TIMEOUT_SECS {
            self.timeout = other.timeout;
        }
    }

    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        let raw = self.url.as_deref().ok_or(ConfigError::MissingUrl)?;
        let mut base = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
            url: raw.to_string(),
            error: e.to_string(),
        })?;

        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        base.join(self.api_path.trim_start_matches('/'))
            .map_err(|e| ConfigError::InvalidUrl {
                url: raw.to_string(),
                error: e.to_string(),
            })
    }

    pub fn http_basic(&self) -> Option<(String, String)> {
        match (&self.http_login_user, &self.http_login_password) {
            (Some(user), password) => Some((user.clone(), password.clone().unwrap_or_default())),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint()?;

        match (&self.username, &self.password) {
            (Some(_), None) | (None, Some(_)) => {
                return Err(ConfigError::Incomplete {
                    first: "username".to_string(),
                    second: "password".to_string(),
                })
            }
            _ => {}
        }

        if self.auth_token.is_none() && self.username.is_none() {
            return Err(ConfigError::MissingCredentials);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn with_url(url: &str) -> ConnectionConfig {
        ConnectionConfig {
            url: Some(url.to_string()),
            auth_token: Some("token".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_endpoint_join() {
        assert_eq!(
            with_url("https://zabbix.example.com").endpoint().unwrap().as_str(),
            "https://zabbix.example.com/api_jsonrpc.php"
        );
        assert_eq!(
            with_url("https://example.com/zabbix").endpoint().unwrap().as_str(),
            "https://example.com/zabbix/api_jsonrpc.php"
        );
    }

    #[test]
    fn test_env_fallback_only_fills_unset() {
        let env: HashMap<&str, &str> = [
            (ENV_API_URL, "https://env.example.com"),
            (ENV_API_TOKEN, "env-token"),
        ]
        .into_iter()
        .collect();

        let mut config = ConnectionConfig {
            auth_token: Some("file-token".to_string()),
            ..Default::default()
        };
        config.apply_env_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.url.as_deref(), Some("https://env.example.com"));
        assert_eq!(config.auth_token.as_deref(), Some("file-token"));
    }

    #[test]
    fn test_validate_credentials() {
        let mut config = with_url("https://example.com");
        assert!(config.validate().is_ok());

        config.auth_token = None;
        assert!(matches!(config.validate(), Err(ConfigError::MissingCredentials)));

        config.username = Some("Admin".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Incomplete { .. })));

        config.password = Some("zabbix".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let mut base = with_url("https://a.example.com");
        let overrides = ConnectionConfig {
            url: Some("https://b.example.com".to_string()),
            timeout: 5,
            ..Default::default()
        };
        base.merge(&overrides);

        assert_eq!(base.url.as_deref(), Some("https://b.example.com"));
        assert_eq!(base.auth_token.as_deref(), Some("token"));
        assert_eq!(base.timeout, 5);
    }

    #[test]
    fn test_yaml_defaults() {
        let config: ConnectionConfig = serde_yaml::from_str("url: https://z.example.com\n").unwrap();
        assert_eq!(config.api_path, DEFAULT_API_PATH);
        assert!(config.validate_certs);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT_SECS);
    }
}
