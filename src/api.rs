use crate::contract::{parse_lock_id, release_timestamp_hint, LockClient, LockId};
use crate::metrics::Metrics;
use crate::models::{ActivityQuery, ActivityRecord, ChainId, NetworkTag};
use crate::resolver::{format_duration, ActivityResolver};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<ActivityResolver>,
    pub locks: Option<Arc<LockClient>>,
    pub metrics: Arc<Metrics>,
}

#[derive(Serialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonResponse {
    pub fn ok(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

type ApiResult = (StatusCode, Json<JsonResponse>);

fn bad_request(message: impl Into<String>) -> ApiResult {
    (StatusCode::BAD_REQUEST, Json(JsonResponse::error(message)))
}

fn internal_error(e: anyhow::Error) -> ApiResult {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(JsonResponse::error(e.to_string())),
    )
}

fn lock_client(state: &AppState) -> Result<&Arc<LockClient>, ApiResult> {
    state.locks.as_ref().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        Json(JsonResponse::error("Lock contract not configured")),
    ))
}

async fn health_handler() -> &'static str {
    "ok"
}

#[derive(Deserialize)]
pub struct ActivityParams {
    pub chain: ChainId,
    pub network: NetworkTag,
    pub address: String,
}

/// The resolver never fails: unsupported pairs, provider outages, and empty
/// histories all come back as a 200 with `found: false`.
async fn activity_handler(
    State(state): State<AppState>,
    Query(params): Query<ActivityParams>,
) -> Json<ActivityRecord> {
    state.metrics.increment_resolves();
    let record = state
        .resolver
        .resolve(&ActivityQuery {
            chain: params.chain,
            network: params.network,
            address: params.address,
        })
        .await;
    if !record.found {
        state.metrics.increment_misses();
    }
    Json(record)
}

#[derive(Deserialize)]
struct LockViewParams {
    // When present, the sender's cross-chain activity is resolved and a
    // contract-side simulation of the refreshed activity time is included.
    chain: Option<ChainId>,
    network: Option<NetworkTag>,
}

async fn get_lock_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<LockViewParams>,
) -> ApiResult {
    let locks = match lock_client(&state) {
        Ok(locks) => locks,
        Err(resp) => return resp,
    };
    let lock_id = match parse_lock_id(&id) {
        Ok(lock_id) => lock_id,
        Err(e) => return bad_request(e.to_string()),
    };

    let (details, time_until, time_since) = tokio::join!(
        locks.lock_details(lock_id),
        locks.time_until_release(lock_id),
        locks.time_since_activity(lock_id),
    );
    let (details, time_until, time_since) = match (details, time_until, time_since) {
        (Ok(d), Ok(u), Ok(s)) => (d, u, s),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => return internal_error(e),
    };

    let mut data = json!({
        "lockId": id,
        "lock": details,
        "timeUntilRelease": time_until,
        "timeUntilReleaseHuman": format_duration(time_until),
        "timeSinceActivity": time_since,
        "timeSinceActivityHuman": format_duration(time_since),
        "eligible": time_until == 0,
    });

    if let (Some(chain), Some(network)) = (params.chain, params.network) {
        state.metrics.increment_resolves();
        let record = state
            .resolver
            .resolve(&ActivityQuery {
                chain,
                network,
                address: details.sender.clone(),
            })
            .await;
        if !record.found {
            state.metrics.increment_misses();
        }
        if record.found && record.timestamp_unix > 0 {
            match locks
                .simulate_activity_update(lock_id, record.timestamp_unix)
                .await
            {
                Ok(simulation) => data["simulation"] = json!(simulation),
                Err(e) => warn!("Activity simulation failed for {}: {}", id, e),
            }
        }
        data["senderActivity"] = json!(record);
    }

    (StatusCode::OK, Json(JsonResponse::ok("Lock", Some(data))))
}

async fn user_locks_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult {
    let locks = match lock_client(&state) {
        Ok(locks) => locks,
        Err(resp) => return resp,
    };
    let ids: Vec<LockId> = match locks.user_locks(&address).await {
        Ok(ids) => ids,
        Err(e) => return bad_request(e.to_string()),
    };

    // Bounded fan-out over the per-lock reads; a lock that fails to load is
    // dropped from the listing rather than failing the whole page.
    let summaries: Vec<Value> = stream::iter(ids)
        .map(|lock_id| {
            let locks = Arc::clone(locks);
            async move {
                let details = locks.lock_details(lock_id).await?;
                let time_until = locks.time_until_release(lock_id).await?;
                Ok::<Value, anyhow::Error>(json!({
                    "lockId": crate::contract::encode_lock_id(lock_id),
                    "lock": details,
                    "timeUntilRelease": time_until,
                    "timeUntilReleaseHuman": format_duration(time_until),
                    "eligible": time_until == 0,
                }))
            }
        })
        .buffer_unordered(4)
        .filter_map(|result| async move {
            match result {
                Ok(summary) => Some(summary),
                Err(e) => {
                    warn!("Skipping unreadable lock: {}", e);
                    None
                }
            }
        })
        .collect()
        .await;

    (
        StatusCode::OK,
        Json(JsonResponse::ok("Locks", Some(json!({ "locks": summaries })))),
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateLockRequest {
    receiver: String,
    inactivity_period_secs: u64,
    value_wei: String,
}

async fn create_lock_handler(
    State(state): State<AppState>,
    Json(payload): Json<CreateLockRequest>,
) -> ApiResult {
    let locks = match lock_client(&state) {
        Ok(locks) => locks,
        Err(resp) => return resp,
    };
    if payload.receiver.is_empty() || payload.inactivity_period_secs == 0 {
        return bad_request("Receiver and a non-zero inactivity period are required");
    }
    match locks
        .create_lock(
            &payload.receiver,
            payload.inactivity_period_secs,
            &payload.value_wei,
        )
        .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(JsonResponse::ok("Lock created", Some(json!(outcome)))),
        ),
        Err(e) => internal_error(e),
    }
}

async fn ping_handler(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let locks = match lock_client(&state) {
        Ok(locks) => locks,
        Err(resp) => return resp,
    };
    let lock_id = match parse_lock_id(&id) {
        Ok(lock_id) => lock_id,
        Err(e) => return bad_request(e.to_string()),
    };
    match locks.ping(lock_id).await {
        Ok(tx_hash) => (
            StatusCode::OK,
            Json(JsonResponse::ok(
                "Activity updated",
                Some(json!({ "txHash": tx_hash })),
            )),
        ),
        Err(e) => internal_error(e),
    }
}

#[derive(Deserialize, Default)]
struct ReleaseRequest {
    // Where to look for the sender's latest cross-chain activity before
    // releasing. Without them the on-chain activity time is used as-is.
    chain: Option<ChainId>,
    network: Option<NetworkTag>,
}

async fn release_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Option<Json<ReleaseRequest>>,
) -> ApiResult {
    let locks = match lock_client(&state) {
        Ok(locks) => locks,
        Err(resp) => return resp,
    };
    let lock_id = match parse_lock_id(&id) {
        Ok(lock_id) => lock_id,
        Err(e) => return bad_request(e.to_string()),
    };
    let params = payload.map(|Json(p)| p).unwrap_or_default();

    let details = match locks.lock_details(lock_id).await {
        Ok(details) => details,
        Err(e) => return internal_error(e),
    };

    let timestamp = match (params.chain, params.network) {
        (Some(chain), Some(network)) => {
            state.metrics.increment_resolves();
            let record = state
                .resolver
                .resolve(&ActivityQuery {
                    chain,
                    network,
                    address: details.sender.clone(),
                })
                .await;
            if !record.found {
                state.metrics.increment_misses();
            }
            release_timestamp_hint(&record, details.last_activity_time)
        }
        _ => details.last_activity_time,
    };

    match locks.release(lock_id, timestamp).await {
        Ok(tx_hash) => (
            StatusCode::OK,
            Json(JsonResponse::ok(
                "Funds released",
                Some(json!({ "txHash": tx_hash, "activityTimestamp": timestamp })),
            )),
        ),
        Err(e) => internal_error(e),
    }
}

async fn contract_balance_handler(State(state): State<AppState>) -> ApiResult {
    let locks = match lock_client(&state) {
        Ok(locks) => locks,
        Err(resp) => return resp,
    };
    match locks.contract_balance().await {
        Ok(balance_wei) => (
            StatusCode::OK,
            Json(JsonResponse::ok(
                "Balance",
                Some(json!({ "balanceWei": balance_wei })),
            )),
        ),
        Err(e) => internal_error(e),
    }
}

async fn cancel_handler(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let locks = match lock_client(&state) {
        Ok(locks) => locks,
        Err(resp) => return resp,
    };
    let lock_id = match parse_lock_id(&id) {
        Ok(lock_id) => lock_id,
        Err(e) => return bad_request(e.to_string()),
    };
    match locks.cancel(lock_id).await {
        Ok(tx_hash) => (
            StatusCode::OK,
            Json(JsonResponse::ok(
                "Lock cancelled",
                Some(json!({ "txHash": tx_hash })),
            )),
        ),
        Err(e) => internal_error(e),
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/activity", get(activity_handler))
        .route("/locks", post(create_lock_handler))
        .route("/locks/:id", get(get_lock_handler))
        .route("/locks/:id/ping", post(ping_handler))
        .route("/locks/:id/release", post(release_handler))
        .route("/locks/:id/cancel", post(cancel_handler))
        .route("/wallets/:address/locks", get(user_locks_handler))
        .route("/contract/balance", get(contract_balance_handler))
        .layer(RequestBodyLimitLayer::new(4096))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
