//! Ansible-style inventory built from Zabbix hosts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::inventory::error::InventoryError;
use crate::inventory::source::{GroupBy, InventorySource};
use crate::inventory::tags::{tag_pairs, tag_to_dict_transform};
use crate::modules::field::scalar_string;

const AGENT_INTERFACE: &str = "1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryGraph {
    pub hosts: BTreeMap<String, InventoryHost>,
    pub groups: BTreeMap<String, InventoryGroup>,
    pub metadata: InventoryMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryHost {
    pub name: String,
    pub address: Option<String>,
    pub variables: Map<String, Value>,
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryGroup {
    pub name: String,
    pub hosts: BTreeSet<String>,
    pub children: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryMetadata {
    pub source: String,
    pub built_at: DateTime<Utc>,
    pub host_count: usize,
    pub group_count: usize,
}

/// Replace every character outside `[A-Za-z0-9_]` with `_`.
pub fn sanitize_group_name(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

impl InventoryGraph {
    pub fn build(hosts: &[Value], source: &InventorySource, origin: &str) -> Self {
        let mut graph = InventoryGraph {
            hosts: BTreeMap::new(),
            groups: BTreeMap::new(),
            metadata: InventoryMetadata {
                source: origin.to_string(),
                built_at: Utc::now(),
                host_count: 0,
                group_count: 0,
            },
        };

        for host in hosts {
            let Some(name) = host.get("host").and_then(scalar_string) else {
                warn!("Skipping host without a technical name");
                continue;
            };

            let mut variables = Map::new();
            if let Value::Object(fields) = host {
                for (field, value) in fields {
                    variables.insert(format!("{}{}", source.prefix, field), value.clone());
                }
            }
            if let Some(tags) = host.get("tags") {
                variables.insert(
                    format!("{}tags_dict", source.prefix),
                    Value::Object(tag_to_dict_transform(tags)),
                );
            }

            let address = ansible_host(host);
            if let Some(address) = &address {
                variables.insert("ansible_host".to_string(), json!(address));
            }

            let groups = derived_groups(host, &source.group_by);
            for group in &groups {
                graph
                    .groups
                    .entry(group.clone())
                    .or_insert_with(|| InventoryGroup {
                        name: group.clone(),
                        ..Default::default()
                    })
                    .hosts
                    .insert(name.clone());
            }

            graph.hosts.insert(
                name.clone(),
                InventoryHost {
                    name,
                    address,
                    variables,
                    groups,
                },
            );
        }

        graph.link_groups();
        graph.metadata.host_count = graph.hosts.len();
        graph.metadata.group_count = graph.groups.len();
        debug!(
            "Built inventory with {} host(s) in {} group(s)",
            graph.metadata.host_count, graph.metadata.group_count
        );
        graph
    }

    /// Make every derived group a child of `all` and collect hosts without
    /// a group under `ungrouped`.
    fn link_groups(&mut self) {
        let ungrouped: BTreeSet<String> = self
            .hosts
            .values()
            .filter(|host| host.groups.is_empty())
            .map(|host| host.name.clone())
            .collect();
        if !ungrouped.is_empty() {
            self.groups.insert(
                "ungrouped".to_string(),
                InventoryGroup {
                    name: "ungrouped".to_string(),
                    hosts: ungrouped,
                    ..Default::default()
                },
            );
        }

        let children: BTreeSet<String> = self.groups.keys().cloned().collect();
        self.groups.insert(
            "all".to_string(),
            InventoryGroup {
                name: "all".to_string(),
                children,
                ..Default::default()
            },
        );
    }

    /// `ansible-inventory --list` document.
    pub fn to_ansible_list(&self) -> Value {
        let hostvars: Map<String, Value> = self
            .hosts
            .iter()
            .map(|(name, host)| (name.clone(), Value::Object(host.variables.clone())))
            .collect();

        let mut document = Map::new();
        document.insert("_meta".to_string(), json!({ "hostvars": hostvars }));
        for (name, group) in &self.groups {
            let mut entry = Map::new();
            if !group.hosts.is_empty() {
                entry.insert("hosts".to_string(), json!(group.hosts));
            }
            if !group.children.is_empty() {
                entry.insert("children".to_string(), json!(group.children));
            }
            document.insert(name.clone(), Value::Object(entry));
        }
        Value::Object(document)
    }

    pub fn host_vars(&self, name: &str) -> Result<Value, InventoryError> {
        self.hosts
            .get(name)
            .map(|host| Value::Object(host.variables.clone()))
            .ok_or_else(|| InventoryError::UnknownHost {
                host: name.to_string(),
            })
    }
}

/// Address of the main agent interface, else of the first main interface.
fn ansible_host(host: &Value) -> Option<String> {
    let interfaces = host.get("interfaces")?.as_array()?;
    let is_main = |iface: &&Value| iface.get("main").and_then(scalar_string).as_deref() == Some("1");

    let chosen = interfaces
        .iter()
        .filter(is_main)
        .find(|iface| iface.get("type").and_then(scalar_string).as_deref() == Some(AGENT_INTERFACE))
        .or_else(|| interfaces.iter().find(is_main))?;

    let key = match chosen.get("useip").and_then(scalar_string).as_deref() {
        Some("0") => "dns",
        _ => "ip",
    };
    chosen
        .get(key)
        .and_then(scalar_string)
        .filter(|address| !address.is_empty())
}

fn derived_groups(host: &Value, group_by: &GroupBy) -> Vec<String> {
    let mut groups = BTreeSet::new();

    if group_by.hostgroups {
        let host_groups = host.get("hostgroups").or_else(|| host.get("groups"));
        for name in names(host_groups) {
            groups.insert(sanitize_group_name(&format!("hostgroup_{name}")));
        }
    }
    if group_by.templates {
        for name in names(host.get("parentTemplates")) {
            groups.insert(sanitize_group_name(&format!("template_{name}")));
        }
    }
    if group_by.tags {
        for (tag, value) in tag_pairs(host.get("tags")) {
            groups.insert(sanitize_group_name(&format!("tag_{tag}_{value}")));
        }
    }
    if group_by.status {
        match host.get("status").and_then(scalar_string).as_deref() {
            Some("0") => {
                groups.insert("status_enabled".to_string());
            }
            Some("1") => {
                groups.insert("status_disabled".to_string());
            }
            _ => {}
        }
    }

    groups.into_iter().collect()
}

fn names(items: Option<&Value>) -> Vec<String> {
    items
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| item.get("name").and_then(scalar_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(extra: &str) -> InventorySource {
        InventorySource::from_yaml(&format!("plugin: rustle.zabbix\n{extra}")).unwrap()
    }

    fn hosts() -> Vec<Value> {
        vec![
            json!({
                "hostid": "10084",
                "host": "web01",
                "status": "0",
                "hostgroups": [{"groupid": "2", "name": "Linux servers"}],
                "parentTemplates": [{"templateid": "10001", "name": "Linux by Zabbix agent"}],
                "tags": [{"tag": "env", "value": "prod"}, {"tag": "env", "value": "eu-1"}],
                "interfaces": [
                    {"type": "2", "main": "1", "useip": "1", "ip": "10.0.0.9", "dns": ""},
                    {"type": "1", "main": "1", "useip": "0", "ip": "10.0.0.1", "dns": "web01.example.com"}
                ]
            }),
            json!({
                "hostid": "10085",
                "host": "db01",
                "status": "1",
                "hostgroups": [],
                "tags": [],
                "interfaces": [{"type": "2", "main": "1", "useip": "1", "ip": "10.0.0.2", "dns": ""}]
            }),
        ]
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_group_name("hostgroup_Linux servers"), "hostgroup_Linux_servers");
        assert_eq!(sanitize_group_name("tag_env_eu-1.a"), "tag_env_eu_1_a");
    }

    #[test]
    fn test_host_variables() {
        let graph = InventoryGraph::build(&hosts(), &source(""), "test");
        let vars = graph.host_vars("web01").unwrap();

        assert_eq!(vars["zabbix_hostid"], json!("10084"));
        assert_eq!(vars["ansible_host"], json!("web01.example.com"));
        assert_eq!(vars["zabbix_tags_dict"], json!({"env": ["prod", "eu-1"]}));
        assert_eq!(graph.host_vars("db01").unwrap()["ansible_host"], json!("10.0.0.2"));
        assert!(matches!(
            graph.host_vars("nope"),
            Err(InventoryError::UnknownHost { .. })
        ));
    }

    #[test]
    fn test_grouping() {
        let source = source("prefix: zbx_\ngroup_by:\n  templates: true\n  tags: true\n  status: true\n");
        let list = InventoryGraph::build(&hosts(), &source, "test").to_ansible_list();

        assert_eq!(list["hostgroup_Linux_servers"]["hosts"], json!(["web01"]));
        assert_eq!(list["template_Linux_by_Zabbix_agent"]["hosts"], json!(["web01"]));
        assert_eq!(list["tag_env_eu_1"]["hosts"], json!(["web01"]));
        assert_eq!(list["status_enabled"]["hosts"], json!(["web01"]));
        assert_eq!(list["status_disabled"]["hosts"], json!(["db01"]));
        assert!(list.get("ungrouped").is_none());
        assert_eq!(list["_meta"]["hostvars"]["db01"]["zbx_host"], json!("db01"));

        let children = list["all"]["children"].as_array().unwrap();
        assert_eq!(children.len(), 6);
        assert!(children.contains(&json!("tag_env_prod")));
    }

    #[test]
    fn test_ungrouped_hosts() {
        let list = InventoryGraph::build(&hosts(), &source(""), "test").to_ansible_list();
        assert_eq!(list["ungrouped"]["hosts"], json!(["db01"]));
        assert_eq!(list["all"]["children"], json!(["hostgroup_Linux_servers", "ungrouped"]));
    }
}
