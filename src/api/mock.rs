//! Recording stand-in for the JSON-RPC transport

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::api::client::ZabbixApi;
use crate::api::error::ApiError;

/// Answers each method from a queue of canned replies. The last reply for a
/// method is repeated once the queue is down to one entry.
#[derive(Default)]
pub struct MockApi {
    replies: Mutex<HashMap<String, VecDeque<Result<Value, String>>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, method: &str, reply: Value) -> Self {
        self.push(method, Ok(reply));
        self
    }

    pub fn with_error(self, method: &str, message: &str) -> Self {
        self.push(method, Err(message.to_string()));
        self
    }

    fn push(&self, method: &str, reply: Result<Value, String>) {
        self.replies
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params)
            .collect()
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|(m, _)| m).collect()
    }
}

#[async_trait]
impl ZabbixApi for MockApi {
    async fn call(&self, method: &str, params: Value) -> Result<Value, ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params));

        let mut replies = self.replies.lock().unwrap();
        let queue = replies.get_mut(method);
        let reply = match queue {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        match reply {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(ApiError::Remote {
                method: method.to_string(),
                message,
                data: None,
            }),
            None => Err(ApiError::Remote {
                method: method.to_string(),
                message: "no mock reply configured".to_string(),
                data: None,
            }),
        }
    }
}
