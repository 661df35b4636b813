//! Minimal JSON-RPC 2.0 client over HTTP POST.

use crate::errors::{ProviderError, ProviderResult, RpcError};
use crate::http::status_error;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default, deserialize_with = "present")]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

/// Keeps an explicit `null` result as `Some(Null)`.
fn present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

/// JSON-RPC client. Cheap to clone; clones share the id counter.
#[derive(Debug, Clone)]
pub struct JsonRpcClient {
    client: Client,
    url: String,
    next_id: Arc<AtomicU64>,
}

impl JsonRpcClient {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Call `method`, returning the raw `result` (which may be JSON null).
    pub async fn call_value(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> ProviderResult<serde_json::Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        tracing::debug!(target: "chain_providers::jsonrpc", id, method, "rpc call");

        let resp = self.client.post(&self.url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(status_error(status, method, &text));
        }

        let decoded: RpcResponse = resp.json().await?;
        if let Some(err) = decoded.error {
            return Err(ProviderError::from(err).with_context("method", method));
        }
        decoded.result.ok_or_else(|| {
            ProviderError::decode(format!("{} response carried neither result nor error", method))
        })
    }

    /// Call `method` and decode a typed result.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> ProviderResult<T> {
        let value = self.call_value(method, params).await?;
        serde_json::from_value(value)
            .map_err(|e| ProviderError::decode(format!("{} result: {}", method, e)))
    }
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_quantity(s: &str) -> ProviderResult<u128> {
    let digits = s.trim().trim_start_matches("0x");
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| ProviderError::decode(format!("Invalid hex quantity {}: {}", s, e)))
}

/// Format a hex quantity without leading zeros.
pub fn quantity(value: u128) -> String {
    format!("0x{:x}", value)
}
