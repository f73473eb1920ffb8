use crate::models::{LastActivity, ProviderKind};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

pub mod explorer;
pub mod ledger_signature;
pub mod rpc_transfer;

pub use explorer::ExplorerProvider;
pub use ledger_signature::LedgerSignatureProvider;
pub use rpc_transfer::RpcTransferProvider;

pub const NO_TRANSACTIONS_MESSAGE: &str = "No transactions found";

/// One adapter per upstream API shape. Adapters are immutable after
/// construction and shared by all concurrent resolve calls; errors they
/// return are absorbed at the resolver boundary, never surfaced to callers.
#[async_trait]
pub trait ActivityProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Fetch the wallet's most recent transaction. An upstream that is
    /// reachable but knows no transactions for the address is a normal
    /// outcome (`found: false`), not an error.
    async fn fetch_last_activity(&self, address: &str) -> Result<LastActivity, anyhow::Error>;
}

// Generic JSON-RPC 2.0 request helper shared by the POST-style providers.
pub(crate) async fn rpc_call<R: for<'de> Deserialize<'de>>(
    client: &Client,
    url: &str,
    method: &str,
    params: serde_json::Value,
) -> Result<R, anyhow::Error> {
    #[derive(Deserialize)]
    struct RpcEnvelope<T> {
        #[allow(dead_code)]
        jsonrpc: Option<String>,
        #[allow(dead_code)]
        id: Option<u64>,
        result: Option<T>,
        error: Option<serde_json::Value>,
    }

    let resp = client
        .post(url)
        .json(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        }))
        .send()
        .await?;

    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(anyhow::anyhow!("RPC request failed: {} - {}", status, text));
    }
    let env: RpcEnvelope<R> = serde_json::from_str(&text)
        .map_err(|e| anyhow::anyhow!("Deserialization Error: {}. Response: {}", e, text))?;
    if let Some(err) = env.error {
        return Err(anyhow::anyhow!("RPC error: {}", err));
    }
    env.result
        .ok_or_else(|| anyhow::anyhow!("Empty result in RPC response: {}", text))
}

pub(crate) fn format_unix_date(timestamp: u64) -> String {
    match DateTime::from_timestamp(timestamp as i64, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "Unknown".to_string(),
    }
}
