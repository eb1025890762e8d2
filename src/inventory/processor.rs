use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::api::ZabbixApi;
use crate::inventory::cache::InventoryCache;
use crate::inventory::error::InventoryError;
use crate::inventory::graph::InventoryGraph;
use crate::inventory::query::fetch_hosts;
use crate::inventory::source::InventorySource;
use crate::version::ApiCapabilities;

/// Turns one inventory source file into an inventory graph, going through
/// the cache when it is enabled.
pub struct InventoryProcessor {
    source: InventorySource,
    source_path: PathBuf,
    cache: Option<InventoryCache>,
}

impl InventoryProcessor {
    pub fn load(path: &Path) -> Result<Self, InventoryError> {
        let source = InventorySource::load(path)?;
        Ok(Self::new(source, path))
    }

    pub fn new(source: InventorySource, path: &Path) -> Self {
        let cache = source.cache_for(path);
        Self {
            source,
            source_path: path.to_path_buf(),
            cache,
        }
    }

    pub fn source(&self) -> &InventorySource {
        &self.source
    }

    /// Hosts from a valid cache entry; `None` means the API must be queried.
    pub async fn cached_hosts(&self) -> Option<Vec<Value>> {
        let cache = self.cache.as_ref()?;
        cache.load(&self.source.input_args()).await
    }

    /// Query Zabbix and refresh the cache. A failed cache write only warns.
    pub async fn fetch(
        &self,
        api: &dyn ZabbixApi,
        capabilities: &ApiCapabilities,
    ) -> Result<Vec<Value>, InventoryError> {
        let hosts = fetch_hosts(api, capabilities, &self.source).await?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store(&self.source.input_args(), &hosts).await {
                warn!("Failed to write inventory cache: {}", e);
            }
        }
        Ok(hosts)
    }

    pub fn build(&self, hosts: &[Value]) -> InventoryGraph {
        let graph = InventoryGraph::build(
            hosts,
            &self.source,
            &self.source_path.display().to_string(),
        );
        info!(
            "Inventory has {} host(s) in {} group(s)",
            graph.metadata.host_count, graph.metadata.group_count
        );
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApi;
    use crate::version::ZabbixVersion;
    use serde_json::json;
    use tempfile::TempDir;

    fn processor(dir: &TempDir) -> InventoryProcessor {
        processor_with(dir, "")
    }

    fn processor_with(dir: &TempDir, extra: &str) -> InventoryProcessor {
        let yaml = format!(
            "plugin: rustle.zabbix\nurl: https://zabbix.example.com\ncache: true\ncache_dir: {}\n{extra}",
            dir.path().display()
        );
        let source = InventorySource::from_yaml(&yaml).unwrap();
        InventoryProcessor::new(source, &dir.path().join("zabbix.yml"))
    }

    #[tokio::test]
    async fn test_fetch_fills_cache() {
        let dir = TempDir::new().unwrap();
        let processor = processor(&dir);
        let caps = ApiCapabilities::for_version(&ZabbixVersion::parse("7.0").unwrap());
        let api = MockApi::new().with("host.get", json!([{"hostid": "1", "host": "web01"}]));

        assert!(processor.cached_hosts().await.is_none());
        let hosts = processor.fetch(&api, &caps).await.unwrap();
        assert_eq!(processor.cached_hosts().await, Some(hosts.clone()));

        let graph = processor.build(&hosts);
        assert_eq!(graph.host_vars("web01").unwrap()["zabbix_hostid"], json!("1"));
    }

    #[tokio::test]
    async fn test_group_by_change_misses_cache() {
        let dir = TempDir::new().unwrap();
        let caps = ApiCapabilities::for_version(&ZabbixVersion::parse("7.0").unwrap());
        let api = MockApi::new().with("host.get", json!([{"hostid": "1", "host": "web01"}]));
        processor(&dir).fetch(&api, &caps).await.unwrap();

        let regrouped = processor_with(&dir, "group_by:\n  tags: true\n");
        assert!(regrouped.cached_hosts().await.is_none());
    }
}
