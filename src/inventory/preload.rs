//! Strict AND across tag filters, evaluated on a preloaded host list
//!
//! The API only ANDs across distinct tag names, so two conditions on the same
//! name can't be expressed server side. The full query runs once without the
//! tag filter; the matching host ids then restrict the real query.

use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use tracing::debug;

use crate::api::ZabbixApi;
use crate::inventory::error::InventoryError;
use crate::inventory::filter::TagFilter;
use crate::inventory::tags::tag_pairs;
use crate::modules::field::scalar_string;

/// Ids of the hosts satisfying every filter, sorted numerically.
pub fn matching_host_ids(hosts: &[Value], filters: &[TagFilter]) -> Vec<String> {
    let mut ids: BTreeSet<(u64, String)> = BTreeSet::new();

    for host in hosts {
        let Some(id) = host.get("hostid").and_then(scalar_string) else {
            continue;
        };
        let tags = tag_pairs(host.get("tags"));
        if filters.iter().all(|filter| filter.matches(&tags)) {
            ids.insert((id.parse().unwrap_or(u64::MAX), id));
        }
    }

    ids.into_iter().map(|(_, id)| id).collect()
}

/// Run `query` without its tag filter and return the ids matching all
/// `filters`.
pub async fn preload_host_ids(
    api: &dyn ZabbixApi,
    query: &Map<String, Value>,
    filters: &[TagFilter],
) -> Result<Vec<String>, InventoryError> {
    let mut preload = query.clone();
    preload.remove("tags");
    preload.remove("evaltype");
    preload.insert("output".to_string(), json!(["hostid"]));
    preload.insert("selectTags".to_string(), json!(["tag", "value"]));

    let hosts = api.call("host.get", Value::Object(preload)).await?;
    let hosts = hosts.as_array().map(Vec::as_slice).unwrap_or_default();
    let ids = matching_host_ids(hosts, filters);

    debug!(
        "Tag preload kept {} of {} host(s)",
        ids.len(),
        hosts.len()
    );
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApi;
    use crate::inventory::filter::TagOperator;

    fn fixture() -> Vec<Value> {
        vec![
            json!({"hostid": "10673", "tags": [{"tag": "port", "value": "22"}]}),
            json!({"hostid": "10674", "tags": [{"tag": "port", "value": "22"}, {"tag": "port", "value": "80"}]}),
            json!({"hostid": "10675", "tags": [{"tag": "port", "value": "22"}, {"tag": "service", "value": "ssh"}]}),
            json!({"hostid": "10676", "tags": [{"tag": "port", "value": "80"}]}),
            json!({"hostid": "10677", "tags": [{"tag": "service", "value": "http"}]}),
            json!({"hostid": "10678", "tags": []}),
            json!({"hostid": "10679", "tags": [{"tag": "port", "value": "443"}, {"tag": "service", "value": "https"}]}),
            json!({"hostid": "10680", "tags": [{"tag": "port", "value": "8080"}]}),
            json!({"hostid": "10681", "tags": [{"tag": "port", "value": "21"}]}),
        ]
    }

    #[test]
    fn test_same_name_equals_and() {
        let filters = [
            TagFilter::new("port", "22", TagOperator::Equals),
            TagFilter::new("port", "80", TagOperator::Equals),
        ];
        assert_eq!(matching_host_ids(&fixture(), &filters), vec!["10674"]);
    }

    #[test]
    fn test_exists_and_not_exists() {
        let filters = [
            TagFilter::new("port", "", TagOperator::Exists),
            TagFilter::new("service", "", TagOperator::NotExists),
        ];
        assert_eq!(
            matching_host_ids(&fixture(), &filters),
            vec!["10673", "10674", "10676", "10680", "10681"]
        );
    }

    #[test]
    fn test_no_filters_keeps_everything() {
        assert_eq!(matching_host_ids(&fixture(), &[]).len(), 9);
    }

    #[tokio::test]
    async fn test_preload_query_drops_tag_filter() {
        let api = MockApi::new().with("host.get", Value::Array(fixture()));
        let mut query = Map::new();
        query.insert("output".to_string(), json!("extend"));
        query.insert("groupids".to_string(), json!(["2"]));
        query.insert("tags".to_string(), json!([{"tag": "port"}]));
        query.insert("evaltype".to_string(), json!("0"));

        let ids = preload_host_ids(
            &api,
            &query,
            &[TagFilter::new("port", "2", TagOperator::Contains)],
        )
        .await
        .unwrap();

        assert_eq!(ids, vec!["10673", "10674", "10675", "10681"]);
        let sent = &api.calls_to("host.get")[0];
        assert!(sent.get("tags").is_none());
        assert!(sent.get("evaltype").is_none());
        assert_eq!(sent["output"], json!(["hostid"]));
        assert_eq!(sent["groupids"], json!(["2"]));
    }
}
