use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainId {
    Ethereum,
    Polygon,
    Arbitrum,
    Optimism,
    Base,
    Bsc,
    Avalanche,
    Solana,
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChainId::Ethereum => "ethereum",
            ChainId::Polygon => "polygon",
            ChainId::Arbitrum => "arbitrum",
            ChainId::Optimism => "optimism",
            ChainId::Base => "base",
            ChainId::Bsc => "bsc",
            ChainId::Avalanche => "avalanche",
            ChainId::Solana => "solana",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkTag {
    Mainnet,
    Testnet,
}

impl fmt::Display for NetworkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkTag::Mainnet => write!(f, "mainnet"),
            NetworkTag::Testnet => write!(f, "testnet"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProviderKind {
    Explorer,
    RpcTransfer,
    LedgerSignature,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Explorer => write!(f, "explorer"),
            ProviderKind::RpcTransfer => write!(f, "rpcTransfer"),
            ProviderKind::LedgerSignature => write!(f, "ledgerSignature"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityQuery {
    pub chain: ChainId,
    pub network: NetworkTag,
    pub address: String,
}

/// What a provider adapter knows about a wallet's most recent transaction,
/// before the resolver stamps the queried chain and network onto it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastActivity {
    pub found: bool,
    pub tx_reference: Option<String>,
    pub timestamp_unix: u64,
    pub date: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub asset: Option<String>,
    pub value_raw: Option<String>,
    pub message: Option<String>,
}

impl LastActivity {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            found: false,
            tx_reference: None,
            timestamp_unix: 0,
            date: None,
            from: None,
            to: None,
            asset: None,
            value_raw: None,
            message: Some(message.into()),
        }
    }
}

/// Canonical last-activity record, one shape regardless of provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub found: bool,
    pub chain: ChainId,
    pub network: NetworkTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_reference: Option<String>,
    pub timestamp_unix: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ActivityRecord {
    pub fn from_activity(query: &ActivityQuery, activity: LastActivity) -> Self {
        Self {
            found: activity.found,
            chain: query.chain,
            network: query.network,
            tx_reference: activity.tx_reference,
            timestamp_unix: activity.timestamp_unix,
            date: activity.date,
            from: activity.from,
            to: activity.to,
            asset: activity.asset,
            value_raw: activity.value_raw,
            message: activity.message,
        }
    }

    pub fn not_found(query: &ActivityQuery, message: impl Into<String>) -> Self {
        Self::from_activity(query, LastActivity::not_found(message))
    }
}
