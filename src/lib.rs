//! Rustle Zabbix - declarative Zabbix configuration
//!
//! Reconciles hosts, host groups, proxies and proxy groups against the Zabbix
//! JSON-RPC API, and turns Zabbix hosts into an Ansible-style inventory.

pub mod api;
pub mod cli;
pub mod config;
pub mod inventory;
pub mod modules;
pub mod version;

pub use api::{ZabbixApi, ZabbixClient};
pub use config::ConnectionConfig;
pub use version::{ApiCapabilities, ZabbixVersion};
