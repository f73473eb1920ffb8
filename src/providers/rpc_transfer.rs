use crate::models::{LastActivity, ProviderKind};
use crate::providers::{format_unix_date, rpc_call, ActivityProvider, NO_TRANSACTIONS_MESSAGE};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// JSON-RPC asset-transfer adapter (alchemy_getAssetTransfers-style).
///
/// The upstream cannot filter on sender-OR-receiver in one call, so every
/// lookup issues a from-filtered and a to-filtered query concurrently and
/// keeps whichever side saw the wallet more recently.
pub struct RpcTransferProvider {
    client: Client,
    endpoint_url: String,
}

#[derive(Clone, Copy)]
enum TransferSide {
    From,
    To,
}

#[derive(Deserialize)]
struct TransfersResult {
    #[serde(default)]
    transfers: Vec<AssetTransfer>,
}

#[derive(Debug, Clone, Deserialize)]
struct AssetTransfer {
    hash: Option<String>,
    from: Option<String>,
    to: Option<String>,
    asset: Option<String>,
    value: Option<serde_json::Number>,
    metadata: Option<TransferMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
struct TransferMetadata {
    #[serde(rename = "blockTimestamp")]
    block_timestamp: Option<String>,
}

impl RpcTransferProvider {
    pub fn new(client: Client, endpoint_url: impl Into<String>) -> Self {
        Self {
            client,
            endpoint_url: endpoint_url.into(),
        }
    }

    async fn fetch_side(
        &self,
        address: &str,
        side: TransferSide,
    ) -> Result<Option<AssetTransfer>, anyhow::Error> {
        let mut filter = json!({
            "fromBlock": "0x0",
            "toBlock": "latest",
            "category": ["external", "internal", "erc20", "erc721", "erc1155"],
            "withMetadata": true,
            "maxCount": "0x1",
            "order": "desc",
        });
        match side {
            TransferSide::From => filter["fromAddress"] = json!(address),
            TransferSide::To => filter["toAddress"] = json!(address),
        }

        let result: TransfersResult = rpc_call(
            &self.client,
            &self.endpoint_url,
            "alchemy_getAssetTransfers",
            json!([filter]),
        )
        .await?;
        Ok(result.transfers.into_iter().next())
    }
}

// ISO-8601 block timestamp to Unix seconds, truncating sub-second precision.
// Zero stands in for a transfer whose metadata never arrived.
fn transfer_timestamp(tx: &AssetTransfer) -> u64 {
    tx.metadata
        .as_ref()
        .and_then(|m| m.block_timestamp.as_deref())
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.timestamp().max(0) as u64)
        .unwrap_or(0)
}

// Business rule, not plumbing: when both sides saw the wallet, the newer
// transfer wins; the to-side keeps ties.
fn pick_newer(
    from_side: Option<AssetTransfer>,
    to_side: Option<AssetTransfer>,
) -> Option<AssetTransfer> {
    match (from_side, to_side) {
        (Some(f), Some(t)) => {
            if transfer_timestamp(&f) > transfer_timestamp(&t) {
                Some(f)
            } else {
                Some(t)
            }
        }
        (Some(f), None) => Some(f),
        (None, Some(t)) => Some(t),
        (None, None) => None,
    }
}

#[async_trait]
impl ActivityProvider for RpcTransferProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::RpcTransfer
    }

    async fn fetch_last_activity(&self, address: &str) -> Result<LastActivity, anyhow::Error> {
        let (from_side, to_side) = tokio::join!(
            self.fetch_side(address, TransferSide::From),
            self.fetch_side(address, TransferSide::To),
        );

        let Some(tx) = pick_newer(from_side?, to_side?) else {
            return Ok(LastActivity::not_found(NO_TRANSACTIONS_MESSAGE));
        };

        let timestamp = transfer_timestamp(&tx);
        let date = if timestamp > 0 {
            format_unix_date(timestamp)
        } else {
            "Unknown".to_string()
        };

        Ok(LastActivity {
            found: true,
            tx_reference: tx.hash,
            timestamp_unix: timestamp,
            date: Some(date),
            from: tx.from,
            to: tx.to,
            asset: tx.asset,
            value_raw: tx.value.map(|v| v.to_string()),
            message: None,
        })
    }
}
