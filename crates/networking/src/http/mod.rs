//! HTTP transport seam and its reqwest implementation

mod client;

pub use client::LoyaltyClient;

use async_trait::async_trait;
use loyalty_core::Result;
use serde_json::Value;

/// Minimal JSON-over-HTTP surface the accessors need.
///
/// Paths are relative to the backend's API root, e.g. `/loyalty/ranks/`.
/// Base URL, auth and timeouts belong to the implementation.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn get(&self, path: &str) -> Result<Value>;

    async fn post(&self, path: &str, body: Value) -> Result<Value>;
}
