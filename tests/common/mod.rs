use async_trait::async_trait;
use rustle_zabbix::api::ApiError;
use rustle_zabbix::ZabbixApi;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Fixed reply per method; every call is recorded.
#[derive(Default)]
pub struct RecordingApi {
    replies: HashMap<String, Vec<Value>>,
    calls: Mutex<Vec<(String, Value)>>,
}

#[allow(dead_code)]
impl RecordingApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for `method`; the last one keeps answering.
    pub fn reply(mut self, method: &str, value: Value) -> Self {
        self.replies.entry(method.to_string()).or_default().push(value);
        self
    }

    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }
}

#[async_trait]
impl ZabbixApi for RecordingApi {
    async fn call(&self, method: &str, params: Value) -> Result<Value, ApiError> {
        let mut calls = self.calls.lock().unwrap();
        let seen = calls.iter().filter(|(m, _)| m == method).count();
        calls.push((method.to_string(), params));

        let replies = self.replies.get(method).ok_or_else(|| ApiError::Remote {
            method: method.to_string(),
            message: "unexpected call".to_string(),
            data: None,
        })?;
        Ok(replies[seen.min(replies.len() - 1)].clone())
    }
}
