use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::inventory::error::InventoryError;

pub const DEFAULT_CACHE_TIMEOUT_SECS: u64 = 3600;

/// Host list cache for one inventory source file
pub struct InventoryCache {
    path: PathBuf,
    ttl: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    input_args: Value,
    zabbix_hosts: Vec<Value>,
    created_at: DateTime<Utc>,
}

impl InventoryCache {
    pub fn new(cache_dir: &Path, source_path: &Path, timeout_secs: u64) -> Self {
        Self {
            path: cache_dir.join(Self::cache_key(source_path)),
            ttl: i64::try_from(timeout_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX),
        }
    }

    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rustle-zabbix")
    }

    pub fn cache_key(source_path: &Path) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source_path.to_string_lossy().as_bytes());
        format!("rustle_zabbix_{:x}", hasher.finalize())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached hosts when the entry was made for the same query and has not
    /// expired. A missing or unreadable entry is a miss.
    pub async fn load(&self, input_args: &Value) -> Option<Vec<Value>> {
        self.load_at(input_args, Utc::now()).await
    }

    pub async fn load_at(&self, input_args: &Value, now: DateTime<Utc>) -> Option<Vec<Value>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(_) => {
                debug!("No inventory cache at {}", self.path.display());
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Ignoring corrupt inventory cache {}: {}", self.path.display(), e);
                return None;
            }
        };

        if entry.input_args != *input_args {
            debug!("Inventory cache was built for different arguments");
            return None;
        }
        if now - entry.created_at > self.ttl {
            debug!("Inventory cache created at {} has expired", entry.created_at);
            return None;
        }

        info!(
            "Using {} cached host(s) from {}",
            entry.zabbix_hosts.len(),
            self.path.display()
        );
        Some(entry.zabbix_hosts)
    }

    pub async fn store(&self, input_args: &Value, hosts: &[Value]) -> Result<(), InventoryError> {
        self.store_at(input_args, hosts, Utc::now()).await
    }

    pub async fn store_at(
        &self,
        input_args: &Value,
        hosts: &[Value],
        created_at: DateTime<Utc>,
    ) -> Result<(), InventoryError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).await?;
        }

        let entry = CacheEntry {
            input_args: input_args.clone(),
            zabbix_hosts: hosts.to_vec(),
            created_at,
        };
        let content = serde_json::to_string(&entry).map_err(|e| InventoryError::Cache {
            reason: e.to_string(),
        })?;
        fs::write(&self.path, content).await?;

        debug!("Cached {} host(s) in {}", hosts.len(), self.path.display());
        Ok(())
    }
}
