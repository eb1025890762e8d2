//! Zabbix resource modules: parameter handling, generators and comparators

pub mod compare;
pub mod error;
pub mod field;
pub mod host;
pub mod hostgroup;
pub mod interface;
pub mod proxy;
pub mod proxy_group;
pub mod registry;
pub mod resolve;
pub mod tables;
pub mod tls;

// Re-export commonly used types
pub use error::*;
pub use field::Field;
pub use interface::*;
pub use registry::ModuleRegistry;
