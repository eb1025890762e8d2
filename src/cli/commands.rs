use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::api::ZabbixClient;
use crate::cli::options::{InventoryArgs, RustleZabbixCli};
use crate::config::ConnectionConfig;
use crate::inventory::InventoryProcessor;
use crate::modules::{ModuleArgs, ModuleContext, ModuleRegistry, ModuleResult};

/// Connection settings: the config file, then `layer`, then command-line
/// flags, with environment fallbacks for whatever is still unset.
pub fn resolve_connection(
    cli: &RustleZabbixCli,
    layer: Option<&ConnectionConfig>,
) -> Result<ConnectionConfig> {
    let mut config = match &cli.config {
        Some(path) => ConnectionConfig::load(path)?,
        None => ConnectionConfig::default(),
    };
    if let Some(layer) = layer {
        config.merge(layer);
    }
    config.merge(&cli.connection_overrides());
    config.apply_env();
    config.validate()?;
    Ok(config)
}

pub fn load_task_args(path: &Path) -> Result<ModuleArgs> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read module arguments from {}", path.display()))?;
    let value: Value = serde_yaml::from_str(&content)
        .with_context(|| format!("Invalid module arguments in {}", path.display()))?;

    match value {
        Value::Object(args) => Ok(ModuleArgs::new(args)),
        Value::Null => Ok(ModuleArgs::default()),
        _ => anyhow::bail!("Module arguments in {} must be a mapping", path.display()),
    }
}

pub async fn run_task(cli: &RustleZabbixCli, module: &str, args_path: &Path) -> Result<ModuleResult> {
    let args = load_task_args(args_path)?;
    let registry = ModuleRegistry::with_zabbix_modules();

    // Bad arguments fail before connecting.
    registry
        .get_module(module)
        .with_context(|| format!("Module not found: {module}"))?
        .validate_args(&args)?;

    let config = resolve_connection(cli, None)?;
    let client = ZabbixClient::connect(&config).await?;
    info!("Running {} against Zabbix {}", module, client.version());

    let context = ModuleContext {
        api: &client,
        capabilities: client.capabilities(),
        check_mode: cli.check,
    };
    let outcome = registry.execute_module(module, &args, &context).await;

    if let Err(e) = client.logout().await {
        warn!("Logout failed: {}", e);
    }
    Ok(outcome?)
}

pub async fn run_inventory(cli: &RustleZabbixCli, args: &InventoryArgs) -> Result<Value> {
    let processor = InventoryProcessor::load(&args.source)?;

    let hosts = match processor.cached_hosts().await {
        Some(hosts) => hosts,
        None => {
            let config = resolve_connection(cli, Some(&processor.source().connection))?;
            let client = ZabbixClient::connect(&config).await?;
            debug!("Querying hosts from Zabbix {}", client.version());

            let fetched = processor.fetch(&client, client.capabilities()).await;
            if let Err(e) = client.logout().await {
                warn!("Logout failed: {}", e);
            }
            fetched?
        }
    };

    let graph = processor.build(&hosts);
    match &args.host {
        Some(host) => Ok(graph.host_vars(host)?),
        None => Ok(graph.to_ansible_list()),
    }
}
