//! Central registry for all Zabbix modules

use crate::modules::{
    error::ReconcileError,
    hostgroup::HostGroupModule,
    host::HostModule,
    interface::{ModuleArgs, ModuleContext, ModuleResult, ZabbixModule},
    proxy::ProxyModule,
    proxy_group::ProxyGroupModule,
};
use std::collections::HashMap;
use tracing::debug;

/// Prefix accepted in front of every module name, as in playbooks.
const COLLECTION_PREFIX: &str = "zabbix_";

/// Central registry for all Zabbix modules
pub struct ModuleRegistry {
    modules: HashMap<String, Box<dyn ZabbixModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Create a registry with the host, host group, proxy and proxy group modules
    pub fn with_zabbix_modules() -> Self {
        let mut registry = Self::new();

        registry.register(Box::new(HostModule::new()));
        registry.register(Box::new(HostGroupModule::new()));
        registry.register(Box::new(ProxyModule::new()));
        registry.register(Box::new(ProxyGroupModule::new()));

        registry
    }

    pub fn register(&mut self, module: Box<dyn ZabbixModule>) {
        self.modules.insert(module.name().to_string(), module);
    }

    /// Look a module up by name; `zabbix_host` and `host` are the same module.
    pub fn get_module(&self, name: &str) -> Option<&dyn ZabbixModule> {
        let name = name.strip_prefix(COLLECTION_PREFIX).unwrap_or(name);
        self.modules.get(name).map(|m| m.as_ref())
    }

    pub fn list_modules(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub async fn execute_module(
        &self,
        module_name: &str,
        args: &ModuleArgs,
        context: &ModuleContext<'_>,
    ) -> Result<ModuleResult, ReconcileError> {
        let module = self
            .get_module(module_name)
            .ok_or_else(|| ReconcileError::ModuleNotFound {
                name: module_name.to_string(),
            })?;

        module.validate_args(args)?;
        debug!(
            "Executing module {} (check mode: {})",
            module.name(),
            context.check_mode
        );

        module.execute(args, context).await
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApi;
    use crate::version::ApiCapabilities;
    use serde_json::json;

    #[test]
    fn test_aliases_resolve() {
        let registry = ModuleRegistry::with_zabbix_modules();
        for name in [
            "host",
            "zabbix_host",
            "hostgroup",
            "zabbix_hostgroup",
            "proxy",
            "zabbix_proxy",
            "proxy_group",
            "zabbix_proxy_group",
        ] {
            assert!(registry.get_module(name).is_some(), "{name}");
        }
        assert_eq!(
            registry.list_modules(),
            vec!["host", "hostgroup", "proxy", "proxy_group"]
        );
    }

    #[tokio::test]
    async fn test_unknown_module() {
        let registry = ModuleRegistry::with_zabbix_modules();
        let api = MockApi::new();
        let caps = ApiCapabilities::for_version(&"7.0".parse().unwrap());
        let context = ModuleContext { api: &api, capabilities: &caps, check_mode: false };

        let err = registry
            .execute_module("zabbix_template", &ModuleArgs::default(), &context)
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::ModuleNotFound { .. }));
    }

    #[tokio::test]
    async fn test_invalid_args_fail_before_any_call() {
        let registry = ModuleRegistry::with_zabbix_modules();
        let api = MockApi::new();
        let caps = ApiCapabilities::for_version(&"7.0".parse().unwrap());
        let context = ModuleContext { api: &api, capabilities: &caps, check_mode: false };

        let err = registry
            .execute_module(
                "host",
                &ModuleArgs::from(json!({"host": "web01", "status": "paused"})),
                &context,
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("got: paused"));
        assert!(api.calls().is_empty());
    }
}
