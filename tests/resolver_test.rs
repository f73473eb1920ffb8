use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use lockpulse::models::{ActivityQuery, ChainId, NetworkTag};
use lockpulse::providers::{ExplorerProvider, LedgerSignatureProvider, RpcTransferProvider};
use lockpulse::registry::ProviderRegistry;
use lockpulse::resolver::ActivityResolver;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

async fn spawn_fixture(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

fn query(chain: ChainId, network: NetworkTag) -> ActivityQuery {
    ActivityQuery {
        chain,
        network,
        address: "0xb1C0fd1C9e63E12eb669eF2136F7727F035717b4".to_string(),
    }
}

fn explorer_resolver(addr: SocketAddr, chain: ChainId, network: NetworkTag) -> ActivityResolver {
    let mut registry = ProviderRegistry::new();
    registry.insert(
        chain,
        network,
        Box::new(ExplorerProvider::new(
            http_client(),
            format!("http://{}/api", addr),
            Some("test-key".to_string()),
        )),
    );
    ActivityResolver::new(registry)
}

#[tokio::test]
async fn unmapped_pair_is_rejected_without_network_calls() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route(
            "/api",
            get(|State(hits): State<Arc<AtomicUsize>>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Json(json!({ "status": "1", "message": "OK", "result": [] }))
            }),
        )
        .with_state(Arc::clone(&hits));
    let addr = spawn_fixture(app).await;

    let resolver = explorer_resolver(addr, ChainId::Ethereum, NetworkTag::Testnet);
    let record = resolver
        .resolve(&query(ChainId::Polygon, NetworkTag::Mainnet))
        .await;

    assert!(!record.found);
    assert_eq!(record.timestamp_unix, 0);
    assert_eq!(record.chain, ChainId::Polygon);
    assert_eq!(record.network, NetworkTag::Mainnet);
    let message = record.message.expect("rejection carries a message");
    assert!(message.contains("Unsupported chain or network"), "{}", message);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn explorer_latest_transaction_is_normalized() {
    let app = Router::new().route(
        "/api",
        get(|| async {
            Json(json!({
                "status": "1",
                "message": "OK",
                "result": [{
                    "timeStamp": "1700000000",
                    "hash": "0xdeadbeef",
                    "from": "0xaaa",
                    "to": "0xbbb",
                    "value": "1000000000000000000"
                }]
            }))
        }),
    );
    let addr = spawn_fixture(app).await;

    let resolver = explorer_resolver(addr, ChainId::Ethereum, NetworkTag::Mainnet);
    let record = resolver
        .resolve(&query(ChainId::Ethereum, NetworkTag::Mainnet))
        .await;

    assert!(record.found);
    assert_eq!(record.timestamp_unix, 1_700_000_000);
    assert_eq!(record.tx_reference.as_deref(), Some("0xdeadbeef"));
    assert_eq!(record.from.as_deref(), Some("0xaaa"));
    assert_eq!(record.to.as_deref(), Some("0xbbb"));
    assert_eq!(record.value_raw.as_deref(), Some("1000000000000000000"));
    assert_eq!(record.chain, ChainId::Ethereum);
    assert!(record.message.is_none());
}

#[tokio::test]
async fn explorer_empty_history_reports_no_transactions() {
    // Explorer APIs flag "nothing for this address" with status 0 and a
    // string result; that is a normal outcome, not an error.
    let app = Router::new().route(
        "/api",
        get(|| async {
            Json(json!({
                "status": "0",
                "message": "No transactions found",
                "result": []
            }))
        }),
    );
    let addr = spawn_fixture(app).await;

    let resolver = explorer_resolver(addr, ChainId::Bsc, NetworkTag::Mainnet);
    let record = resolver
        .resolve(&query(ChainId::Bsc, NetworkTag::Mainnet))
        .await;

    assert!(!record.found);
    assert_eq!(record.timestamp_unix, 0);
    assert_eq!(record.message.as_deref(), Some("No transactions found"));
}

#[tokio::test]
async fn resolve_is_idempotent_against_unchanged_upstream() {
    let app = Router::new().route(
        "/api",
        get(|| async {
            Json(json!({
                "status": "1",
                "message": "OK",
                "result": [{
                    "timeStamp": "1690000000",
                    "hash": "0xabc",
                    "from": "0x1",
                    "to": "0x2",
                    "value": "42"
                }]
            }))
        }),
    );
    let addr = spawn_fixture(app).await;

    let resolver = explorer_resolver(addr, ChainId::Avalanche, NetworkTag::Testnet);
    let q = query(ChainId::Avalanche, NetworkTag::Testnet);
    let first = resolver.resolve(&q).await;
    let second = resolver.resolve(&q).await;
    assert_eq!(first, second);
}

fn transfer_fixture(side_hash: &str, iso_timestamp: &str, value: f64) -> Value {
    json!([{
        "hash": side_hash,
        "from": "0xsender",
        "to": "0xother",
        "asset": "ETH",
        "value": value,
        "metadata": { "blockTimestamp": iso_timestamp }
    }])
}

fn rpc_transfer_resolver(addr: SocketAddr) -> ActivityResolver {
    let mut registry = ProviderRegistry::new();
    registry.insert(
        ChainId::Polygon,
        NetworkTag::Testnet,
        Box::new(RpcTransferProvider::new(
            http_client(),
            format!("http://{}/", addr),
        )),
    );
    ActivityResolver::new(registry)
}

#[tokio::test]
async fn transfer_lookup_picks_the_newer_of_both_sides() {
    // from-filtered query sees T=100, to-filtered sees T=200.
    let app = Router::new().route(
        "/",
        post(|Json(body): Json<Value>| async move {
            let filter = &body["params"][0];
            let transfers = if filter.get("fromAddress").is_some() {
                transfer_fixture("0xfrom", "1970-01-01T00:01:40.000Z", 1.5)
            } else {
                transfer_fixture("0xto", "1970-01-01T00:03:20.000Z", 2.5)
            };
            Json(json!({ "jsonrpc": "2.0", "id": 1, "result": { "transfers": transfers } }))
        }),
    );
    let addr = spawn_fixture(app).await;

    let resolver = rpc_transfer_resolver(addr);
    let record = resolver
        .resolve(&query(ChainId::Polygon, NetworkTag::Testnet))
        .await;

    assert!(record.found);
    assert_eq!(record.timestamp_unix, 200);
    assert_eq!(record.tx_reference.as_deref(), Some("0xto"));
    assert_eq!(record.asset.as_deref(), Some("ETH"));
    assert_eq!(record.value_raw.as_deref(), Some("2.5"));
}

#[tokio::test]
async fn transfer_lookup_uses_a_single_sided_result() {
    let app = Router::new().route(
        "/",
        post(|Json(body): Json<Value>| async move {
            let filter = &body["params"][0];
            let transfers = if filter.get("toAddress").is_some() {
                transfer_fixture("0xonly", "2023-11-14T22:13:20.000Z", 0.25)
            } else {
                json!([])
            };
            Json(json!({ "jsonrpc": "2.0", "id": 1, "result": { "transfers": transfers } }))
        }),
    );
    let addr = spawn_fixture(app).await;

    let resolver = rpc_transfer_resolver(addr);
    let record = resolver
        .resolve(&query(ChainId::Polygon, NetworkTag::Testnet))
        .await;

    assert!(record.found);
    assert_eq!(record.tx_reference.as_deref(), Some("0xonly"));
    assert_eq!(record.timestamp_unix, 1_700_000_000);
}

#[tokio::test]
async fn transfer_lookup_with_no_results_on_either_side() {
    let app = Router::new().route(
        "/",
        post(|| async {
            Json(json!({ "jsonrpc": "2.0", "id": 1, "result": { "transfers": [] } }))
        }),
    );
    let addr = spawn_fixture(app).await;

    let resolver = rpc_transfer_resolver(addr);
    let record = resolver
        .resolve(&query(ChainId::Polygon, NetworkTag::Testnet))
        .await;

    assert!(!record.found);
    assert_eq!(record.message.as_deref(), Some("No transactions found"));
}

fn ledger_resolver(addr: SocketAddr) -> ActivityResolver {
    let mut registry = ProviderRegistry::new();
    registry.insert(
        ChainId::Solana,
        NetworkTag::Mainnet,
        Box::new(LedgerSignatureProvider::new(
            http_client(),
            format!("http://{}/", addr),
        )),
    );
    ActivityResolver::new(registry)
}

#[tokio::test]
async fn signature_with_block_time_is_normalized() {
    let app = Router::new().route(
        "/",
        post(|| async {
            Json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": [{ "signature": "5VERYsig", "slot": 12345, "blockTime": 1700000000 }]
            }))
        }),
    );
    let addr = spawn_fixture(app).await;

    let record = ledger_resolver(addr)
        .resolve(&query(ChainId::Solana, NetworkTag::Mainnet))
        .await;

    assert!(record.found);
    assert_eq!(record.tx_reference.as_deref(), Some("5VERYsig"));
    assert_eq!(record.timestamp_unix, 1_700_000_000);
}

#[tokio::test]
async fn signature_without_block_time_is_still_found() {
    // Deliberately preserved behavior: a signature whose block time is not
    // yet known still reports found=true with a zero timestamp. Pending a
    // product decision on whether this should become found=false; the
    // release path already refuses to use the zero.
    let app = Router::new().route(
        "/",
        post(|| async {
            Json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": [{ "signature": "pendingSig", "slot": 99, "blockTime": null }]
            }))
        }),
    );
    let addr = spawn_fixture(app).await;

    let record = ledger_resolver(addr)
        .resolve(&query(ChainId::Solana, NetworkTag::Mainnet))
        .await;

    assert!(record.found);
    assert_eq!(record.timestamp_unix, 0);
    assert_eq!(record.date.as_deref(), Some("Unknown"));
    assert_eq!(record.tx_reference.as_deref(), Some("pendingSig"));
}

#[tokio::test]
async fn ledger_empty_history_reports_no_transactions() {
    let app = Router::new().route(
        "/",
        post(|| async { Json(json!({ "jsonrpc": "2.0", "id": 1, "result": [] })) }),
    );
    let addr = spawn_fixture(app).await;

    let record = ledger_resolver(addr)
        .resolve(&query(ChainId::Solana, NetworkTag::Mainnet))
        .await;

    assert!(!record.found);
    assert_eq!(record.message.as_deref(), Some("No transactions found"));
}

#[tokio::test]
async fn transport_failure_degrades_to_not_found() {
    // Bind a port, then close it so the connection is refused.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    for (chain, network, resolver) in [
        (
            ChainId::Ethereum,
            NetworkTag::Mainnet,
            explorer_resolver(addr, ChainId::Ethereum, NetworkTag::Mainnet),
        ),
        (ChainId::Polygon, NetworkTag::Testnet, {
            let mut registry = ProviderRegistry::new();
            registry.insert(
                ChainId::Polygon,
                NetworkTag::Testnet,
                Box::new(RpcTransferProvider::new(
                    http_client(),
                    format!("http://{}/", addr),
                )),
            );
            ActivityResolver::new(registry)
        }),
        (ChainId::Solana, NetworkTag::Mainnet, ledger_resolver(addr)),
    ] {
        let record = resolver.resolve(&query(chain, network)).await;
        assert!(!record.found, "{}/{} should degrade", chain, network);
        assert_eq!(record.timestamp_unix, 0);
        assert_eq!(record.chain, chain);
        assert_eq!(record.network, network);
        let message = record.message.unwrap_or_default();
        assert!(!message.is_empty(), "{}/{} should carry a message", chain, network);
    }
}

#[tokio::test]
async fn upstream_server_error_degrades_to_not_found() {
    let app = Router::new().route(
        "/api",
        get(|| async { (axum::http::StatusCode::BAD_GATEWAY, "upstream exploded") }),
    );
    let addr = spawn_fixture(app).await;

    let resolver = explorer_resolver(addr, ChainId::Ethereum, NetworkTag::Mainnet);
    let record = resolver
        .resolve(&query(ChainId::Ethereum, NetworkTag::Mainnet))
        .await;

    assert!(!record.found);
    let message = record.message.unwrap_or_default();
    assert!(message.contains("502"), "{}", message);
}
