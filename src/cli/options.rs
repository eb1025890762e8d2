use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ConnectionConfig;

/// Reconcile Zabbix hosts, host groups and proxies, or print a Zabbix-backed
/// inventory
#[derive(Debug, Parser)]
#[command(name = "rustle-zabbix")]
#[command(about = "Declarative Zabbix configuration and dynamic inventory")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct RustleZabbixCli {
    #[command(subcommand)]
    pub command: Command,

    /// Connection settings file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Zabbix frontend URL
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// API token
    #[arg(long, global = true)]
    pub auth_token: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Report what would change without changing it
    #[arg(long, global = true)]
    pub check: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create, update or delete a host
    Host(TaskArgs),
    /// Create or delete host groups
    Hostgroup(TaskArgs),
    /// Create, update or delete a proxy
    Proxy(TaskArgs),
    /// Create, update or delete a proxy group
    ProxyGroup(TaskArgs),
    /// Print a dynamic inventory built from Zabbix hosts
    Inventory(InventoryArgs),
}

#[derive(Debug, Args)]
pub struct TaskArgs {
    /// Module arguments file (YAML or JSON)
    #[arg(short, long)]
    pub args: PathBuf,
}

#[derive(Debug, Args)]
pub struct InventoryArgs {
    /// Inventory source file
    #[arg(short = 'i', long = "inventory")]
    pub source: PathBuf,

    /// Print the whole inventory
    #[arg(long, conflicts_with = "host", required_unless_present = "host")]
    pub list: bool,

    /// Print the variables of one host
    #[arg(long)]
    pub host: Option<String>,
}

impl Command {
    /// Registry name of the module behind a task subcommand.
    pub fn module(&self) -> Option<(&'static str, &TaskArgs)> {
        match self {
            Command::Host(args) => Some(("host", args)),
            Command::Hostgroup(args) => Some(("hostgroup", args)),
            Command::Proxy(args) => Some(("proxy", args)),
            Command::ProxyGroup(args) => Some(("proxy_group", args)),
            Command::Inventory(_) => None,
        }
    }
}

impl RustleZabbixCli {
    /// Connection overrides given on the command line.
    pub fn connection_overrides(&self) -> ConnectionConfig {
        ConnectionConfig {
            url: self.url.clone(),
            auth_token: self.auth_token.clone(),
            ..Default::default()
        }
    }
}
