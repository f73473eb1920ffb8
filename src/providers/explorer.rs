use crate::models::{LastActivity, ProviderKind};
use crate::providers::{format_unix_date, ActivityProvider, NO_TRANSACTIONS_MESSAGE};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// Block-explorer REST adapter (etherscan-style account/txlist endpoints).
pub struct ExplorerProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

// `result` changes type between success (transaction array) and failure
// (error string), so it stays raw until the status flag is checked.
#[derive(Deserialize)]
struct ExplorerEnvelope {
    status: String,
    #[allow(dead_code)]
    message: Option<String>,
    result: serde_json::Value,
}

#[derive(Deserialize)]
struct ExplorerTx {
    #[serde(rename = "timeStamp")]
    time_stamp: String,
    hash: String,
    from: String,
    to: String,
    value: String,
}

impl ExplorerProvider {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl ActivityProvider for ExplorerProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Explorer
    }

    async fn fetch_last_activity(&self, address: &str) -> Result<LastActivity, anyhow::Error> {
        // Descending sort plus a one-entry page keeps the payload to the
        // single transaction we care about.
        let mut query: Vec<(&str, String)> = vec![
            ("module", "account".to_string()),
            ("action", "txlist".to_string()),
            ("address", address.to_string()),
            ("sort", "desc".to_string()),
            ("page", "1".to_string()),
            ("offset", "1".to_string()),
        ];
        if let Some(key) = &self.api_key {
            query.push(("apikey", key.clone()));
        }

        let resp = self.client.get(&self.base_url).query(&query).send().await?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "Explorer request failed: {} - {}",
                status,
                text
            ));
        }

        let envelope: ExplorerEnvelope = serde_json::from_str(&text)
            .map_err(|e| anyhow::anyhow!("Deserialization Error: {}. Response: {}", e, text))?;
        if envelope.status != "1" {
            return Ok(LastActivity::not_found(NO_TRANSACTIONS_MESSAGE));
        }

        let txs: Vec<ExplorerTx> = serde_json::from_value(envelope.result)
            .map_err(|e| anyhow::anyhow!("Unexpected explorer result shape: {}", e))?;
        let Some(latest) = txs.into_iter().next() else {
            return Ok(LastActivity::not_found(NO_TRANSACTIONS_MESSAGE));
        };

        let timestamp = latest
            .time_stamp
            .parse::<u64>()
            .map_err(|e| anyhow::anyhow!("Bad explorer timestamp '{}': {}", latest.time_stamp, e))?;

        Ok(LastActivity {
            found: true,
            tx_reference: Some(latest.hash),
            timestamp_unix: timestamp,
            date: Some(format_unix_date(timestamp)),
            from: Some(latest.from),
            to: Some(latest.to),
            asset: None,
            value_raw: Some(latest.value),
            message: None,
        })
    }
}
