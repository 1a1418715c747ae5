use async_trait::async_trait;
use loyalty_cache::{CacheConfig, QueryCache};
use loyalty_core::{Error, Result};
use loyalty_networking::{ApiTransport, LoyaltyApi};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

/// In-memory stand-in for the loyalty backend
#[derive(Default)]
pub struct FakeTransport {
    replies: Mutex<HashMap<(&'static str, String), Result<Value>>>,
    calls: Mutex<Vec<Call>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on_get(&self, path: &str, reply: Result<Value>) {
        self.replies.lock().unwrap().insert(("GET", path.to_string()), reply);
    }

    pub fn on_post(&self, path: &str, reply: Result<Value>) {
        self.replies.lock().unwrap().insert(("POST", path.to_string()), reply);
    }

    /// Hold every GET until the returned notify is signalled
    pub fn hold_gets(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    fn record(&self, method: &'static str, path: &str, body: Option<Value>) -> Result<Value> {
        self.calls.lock().unwrap().push(Call {
            method,
            path: path.to_string(),
            body,
        });
        self.replies
            .lock()
            .unwrap()
            .get(&(method, path.to_string()))
            .cloned()
            .unwrap_or_else(|| {
                Err(Error::ApiError {
                    status: 404,
                    message: format!("no route for {method} {path}"),
                })
            })
    }
}

#[async_trait]
impl ApiTransport for FakeTransport {
    async fn get(&self, path: &str) -> Result<Value> {
        let reply = self.record("GET", path, None);
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        reply
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        self.record("POST", path, Some(body))
    }
}

/// Accessors over a fake backend with a long freshness window
pub fn api_with(transport: &Arc<FakeTransport>) -> LoyaltyApi {
    let cache = QueryCache::new(CacheConfig::new(
        Duration::from_secs(300),
        Duration::from_secs(300),
    ));
    LoyaltyApi::new(transport.clone(), Arc::new(cache))
}
