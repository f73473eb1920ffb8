use crate::models::{LastActivity, ProviderKind};
use crate::providers::{format_unix_date, rpc_call, ActivityProvider, NO_TRANSACTIONS_MESSAGE};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// Signature-history adapter (getSignaturesForAddress-style ledgers).
pub struct LedgerSignatureProvider {
    client: Client,
    endpoint_url: String,
}

#[derive(Deserialize)]
struct SignatureEntry {
    signature: String,
    #[serde(rename = "blockTime")]
    block_time: Option<i64>,
}

impl LedgerSignatureProvider {
    pub fn new(client: Client, endpoint_url: impl Into<String>) -> Self {
        Self {
            client,
            endpoint_url: endpoint_url.into(),
        }
    }
}

#[async_trait]
impl ActivityProvider for LedgerSignatureProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::LedgerSignature
    }

    async fn fetch_last_activity(&self, address: &str) -> Result<LastActivity, anyhow::Error> {
        let entries: Vec<SignatureEntry> = rpc_call(
            &self.client,
            &self.endpoint_url,
            "getSignaturesForAddress",
            json!([address, { "limit": 1 }]),
        )
        .await?;

        let Some(entry) = entries.into_iter().next() else {
            return Ok(LastActivity::not_found(NO_TRANSACTIONS_MESSAGE));
        };

        // The ledger may return a signature whose block time is not yet
        // known. Such an entry still counts as found, with a zero timestamp
        // that callers must not compare against real instants.
        // TODO: confirm with the lock-contract owners whether a timestamp-less
        // signature should instead be reported as inconclusive (found: false).
        let timestamp = entry.block_time.unwrap_or(0).max(0) as u64;
        let date = if timestamp > 0 {
            format_unix_date(timestamp)
        } else {
            "Unknown".to_string()
        };

        Ok(LastActivity {
            found: true,
            tx_reference: Some(entry.signature),
            timestamp_unix: timestamp,
            date: Some(date),
            from: None,
            to: None,
            asset: None,
            value_raw: None,
            message: None,
        })
    }
}
