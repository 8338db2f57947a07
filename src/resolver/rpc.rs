use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};

use crate::epoch::EpochSchedule;
use crate::http::post_json;
use crate::resolver::ActivationResolver;

/// JSON-RPC implementation of [`ActivationResolver`] against a cluster
/// endpoint. One request per call; retry policy is the caller's business.
pub struct RpcResolver {
    url: String,
}

impl RpcResolver {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response = post_json(&self.url, &payload).await?;
        if let Some(error) = response.get("error") {
            return Err(anyhow!("RPC {method} failed: {error}"));
        }
        response
            .get("result")
            .cloned()
            .ok_or_else(|| anyhow!("RPC {method} returned no result"))
    }
}

#[async_trait]
impl ActivationResolver for RpcResolver {
    async fn get_epoch_schedule(&self) -> Result<EpochSchedule> {
        let result = self.call("getEpochSchedule", json!([])).await?;
        serde_json::from_value(result).context("invalid getEpochSchedule response")
    }

    async fn get_account_data(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let result = self
            .call("getAccountInfo", json!([key, { "encoding": "base64" }]))
            .await?;
        match result.get("value") {
            None | Some(Value::Null) => Ok(None),
            Some(account) => {
                let encoded = account
                    .get("data")
                    .and_then(|data| data.get(0))
                    .and_then(Value::as_str)
                    .ok_or_else(|| anyhow!("unexpected account data shape for {key}"))?;
                let bytes = BASE64
                    .decode(encoded)
                    .with_context(|| format!("invalid base64 account data for {key}"))?;
                Ok(Some(bytes))
            }
        }
    }
}
