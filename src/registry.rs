use crate::models::{ChainId, NetworkTag};
use crate::providers::{
    ActivityProvider, ExplorerProvider, LedgerSignatureProvider, RpcTransferProvider,
};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

/// Credentials and transport settings the provider endpoints are built from.
/// Populated once at startup; the registry built from it is read-only.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Query-parameter key for the explorer-style endpoints. Optional: those
    /// endpoints answer key-less requests, just with tighter rate limits.
    pub explorer_api_key: Option<String>,
    /// Path-embedded key for the transfer-RPC and ledger endpoints. Pairs
    /// backed by these vendors are skipped entirely when it is absent.
    pub transfer_api_key: Option<String>,
    pub http_timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            explorer_api_key: None,
            transfer_api_key: None,
            http_timeout: Duration::from_secs(10),
        }
    }
}

/// Immutable map from `(chain, network)` to the one provider adapter that
/// serves the pair.
pub struct ProviderRegistry {
    providers: HashMap<(ChainId, NetworkTag), Box<dyn ActivityProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    pub fn insert(
        &mut self,
        chain: ChainId,
        network: NetworkTag,
        provider: Box<dyn ActivityProvider>,
    ) {
        self.providers.insert((chain, network), provider);
    }

    pub fn get(&self, chain: ChainId, network: NetworkTag) -> Option<&dyn ActivityProvider> {
        self.providers.get(&(chain, network)).map(|p| p.as_ref())
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Build the full endpoint table for the supported chain/network pairs.
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, anyhow::Error> {
        // HTTP/1.1 avoids ALPN issues with some vendors; the explicit timeout
        // bounds a resolve call even when the upstream hangs.
        let client = Client::builder()
            .http1_only()
            .timeout(settings.http_timeout)
            .build()?;

        let mut registry = Self::new();

        let explorer_pairs: [(ChainId, NetworkTag, &str); 10] = [
            (
                ChainId::Ethereum,
                NetworkTag::Mainnet,
                "https://api.etherscan.io/api",
            ),
            (
                ChainId::Ethereum,
                NetworkTag::Testnet,
                "https://api-sepolia.etherscan.io/api",
            ),
            (
                ChainId::Polygon,
                NetworkTag::Mainnet,
                "https://api.polygonscan.com/api",
            ),
            (
                ChainId::Arbitrum,
                NetworkTag::Mainnet,
                "https://api.arbiscan.io/api",
            ),
            (
                ChainId::Optimism,
                NetworkTag::Mainnet,
                "https://api-optimistic.etherscan.io/api",
            ),
            (
                ChainId::Base,
                NetworkTag::Mainnet,
                "https://api.basescan.org/api",
            ),
            (
                ChainId::Bsc,
                NetworkTag::Mainnet,
                "https://api.bscscan.com/api",
            ),
            (
                ChainId::Bsc,
                NetworkTag::Testnet,
                "https://api-testnet.bscscan.com/api",
            ),
            (
                ChainId::Avalanche,
                NetworkTag::Mainnet,
                "https://api.snowtrace.io/api",
            ),
            (
                ChainId::Avalanche,
                NetworkTag::Testnet,
                "https://api-testnet.snowtrace.io/api",
            ),
        ];
        for (chain, network, url) in explorer_pairs {
            registry.insert(
                chain,
                network,
                Box::new(ExplorerProvider::new(
                    client.clone(),
                    url,
                    settings.explorer_api_key.clone(),
                )),
            );
        }

        let transfer_pairs: [(ChainId, NetworkTag, &str); 4] = [
            (ChainId::Polygon, NetworkTag::Testnet, "polygon-amoy"),
            (ChainId::Arbitrum, NetworkTag::Testnet, "arb-sepolia"),
            (ChainId::Optimism, NetworkTag::Testnet, "opt-sepolia"),
            (ChainId::Base, NetworkTag::Testnet, "base-sepolia"),
        ];
        let ledger_pairs: [(ChainId, NetworkTag, &str); 2] = [
            (ChainId::Solana, NetworkTag::Mainnet, "solana-mainnet"),
            (ChainId::Solana, NetworkTag::Testnet, "solana-devnet"),
        ];

        match &settings.transfer_api_key {
            Some(key) => {
                for (chain, network, slug) in transfer_pairs {
                    let url = format!("https://{}.g.alchemy.com/v2/{}", slug, key);
                    registry.insert(
                        chain,
                        network,
                        Box::new(RpcTransferProvider::new(client.clone(), url)),
                    );
                }
                for (chain, network, slug) in ledger_pairs {
                    let url = format!("https://{}.g.alchemy.com/v2/{}", slug, key);
                    registry.insert(
                        chain,
                        network,
                        Box::new(LedgerSignatureProvider::new(client.clone(), url)),
                    );
                }
            }
            None => {
                for (chain, network, _) in transfer_pairs.iter().chain(ledger_pairs.iter()) {
                    warn!(
                        "No transfer API key configured, {}/{} will be unsupported",
                        chain, network
                    );
                }
            }
        }

        Ok(registry)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
