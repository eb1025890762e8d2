//! Inventory source file

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::ConnectionConfig;
use crate::inventory::cache::{InventoryCache, DEFAULT_CACHE_TIMEOUT_SECS};
use crate::inventory::error::InventoryError;
use crate::inventory::filter::RawTagFilter;

pub const PLUGIN_NAMES: &[&str] = &[
    "rustle.zabbix",
    "zabbix.zabbix.zabbix_inventory",
    "zabbix_inventory",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySource {
    pub plugin: String,
    #[serde(flatten)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub filter: HostFilter,
    /// Host fields to return; `None` means `extend`
    #[serde(default)]
    pub output: Option<Vec<String>>,
    #[serde(default)]
    pub selects: BTreeMap<String, bool>,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub group_by: GroupBy,
    #[serde(default)]
    pub cache: bool,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_cache_timeout")]
    pub cache_timeout: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostFilter {
    pub hostgroups: Vec<String>,
    pub templates: Vec<String>,
    pub proxy: Vec<String>,
    pub host: Vec<String>,
    pub tags: Vec<RawTagFilter>,
    pub tags_behavior: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroupBy {
    pub hostgroups: bool,
    pub templates: bool,
    pub tags: bool,
    pub status: bool,
}

impl Default for GroupBy {
    fn default() -> Self {
        Self {
            hostgroups: true,
            templates: false,
            tags: false,
            status: false,
        }
    }
}

fn default_prefix() -> String {
    "zabbix_".to_string()
}

fn default_cache_timeout() -> u64 {
    DEFAULT_CACHE_TIMEOUT_SECS
}

impl InventorySource {
    pub fn load(path: &Path) -> Result<Self, InventoryError> {
        let content = std::fs::read_to_string(path).map_err(|e| InventoryError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_yaml(&content).map_err(|reason| InventoryError::Config {
            path: path.display().to_string(),
            reason,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, String> {
        let source: InventorySource =
            serde_yaml::from_str(content).map_err(|e| e.to_string())?;

        if !PLUGIN_NAMES.contains(&source.plugin.as_str()) {
            return Err(format!(
                "plugin must be one of: {}, got: {}",
                PLUGIN_NAMES.join(", "),
                source.plugin
            ));
        }
        Ok(source)
    }

    /// Everything that shapes the host query; a cached result is only reused
    /// when these match.
    pub fn input_args(&self) -> Value {
        json!({
            "url": self.connection.url,
            "filter": self.filter,
            "output": self.output,
            "selects": self.selects,
            "group_by": self.group_by,
        })
    }

    pub fn cache_for(&self, source_path: &Path) -> Option<InventoryCache> {
        if !self.cache {
            return None;
        }
        let dir = self
            .cache_dir
            .clone()
            .unwrap_or_else(InventoryCache::default_dir);
        Some(InventoryCache::new(&dir, source_path, self.cache_timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
plugin: zabbix.zabbix.zabbix_inventory
url: https://zabbix.example.com
auth_token: secret
filter:
  hostgroups: [Linux servers]
  tags:
    - tag: port
      value: 22
      operator: equals
  tags_behavior: and
selects:
  selectInterfaces: true
group_by:
  tags: true
cache: true
cache_timeout: 60
"#;

    #[test]
    fn test_parse_source() {
        let source = InventorySource::from_yaml(SOURCE).unwrap();
        assert_eq!(source.connection.url.as_deref(), Some("https://zabbix.example.com"));
        assert_eq!(source.filter.hostgroups, vec!["Linux servers"]);
        assert_eq!(source.filter.tags[0].value, Some(Value::from(22)));
        assert_eq!(source.prefix, "zabbix_");
        assert!(source.group_by.hostgroups);
        assert!(source.group_by.tags);
        assert_eq!(source.cache_timeout, 60);
    }

    #[test]
    fn test_unknown_plugin_rejected() {
        let err = InventorySource::from_yaml("plugin: constructed\n").unwrap_err();
        assert!(err.contains("got: constructed"));
    }

    #[test]
    fn test_input_args_ignore_credentials() {
        let a = InventorySource::from_yaml(SOURCE).unwrap();
        let mut b = a.clone();
        b.connection.auth_token = Some("other".to_string());
        assert_eq!(a.input_args(), b.input_args());

        b.filter.hostgroups.push("Discovered hosts".to_string());
        assert_ne!(a.input_args(), b.input_args());
    }

    #[test]
    fn test_input_args_follow_group_by() {
        let a = InventorySource::from_yaml(SOURCE).unwrap();
        let mut b = a.clone();
        b.group_by.status = true;
        assert_ne!(a.input_args(), b.input_args());
    }

    #[test]
    fn test_cache_disabled_by_default() {
        let source = InventorySource::from_yaml("plugin: rustle.zabbix\n").unwrap();
        assert!(source.cache_for(Path::new("inv.yml")).is_none());
    }
}
