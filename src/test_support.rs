// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared test fixtures: a scripted in-memory chain, a stub JSON-RPC node
//! and a deterministic pool.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use base64ct::{Base64, Encoding};
use serde_json::{json, Value};
use solana_sdk::signer::keypair::keypair_from_seed;

use crate::blockchain::client::{ChainClient, ClientError, RpcClient, SubmitOptions};
use crate::blockchain::transactions::SignedTransaction;
use crate::blockchain::types::{
    Commitment, FailureKind, Hash, Pubkey, ReferenceHash, Signature, SignatureStatus,
    LAMPORTS_PER_SOL,
};
use crate::config::{GateConfig, RpcConfig, WithdrawalConfig};
use crate::custody::PoolCredential;
use crate::state::AppState;
use crate::withdrawal::gate::RateGate;

pub const TEST_SEED: [u8; 32] = [42u8; 32];

/// Deterministic pool credential.
pub fn test_credential() -> PoolCredential {
    PoolCredential::from_keypair(keypair_from_seed(&TEST_SEED).unwrap())
}

/// A valid recipient that is neither the pool nor the System Program.
pub fn test_recipient() -> Pubkey {
    Pubkey::new_from_array([7u8; 32])
}

/// Withdrawal settings with a short confirmation budget.
pub fn test_withdrawal_config() -> WithdrawalConfig {
    WithdrawalConfig {
        confirm_timeout: Duration::from_secs(5),
        poll_interval: Duration::from_millis(500),
        ..WithdrawalConfig::default()
    }
}

/// Application state wired to `chain` with a gate admitting `max_requests`.
pub fn test_state(chain: Arc<MockChain>, max_requests: u32) -> AppState {
    AppState::new(
        Arc::new(test_credential()),
        chain,
        Arc::new(RateGate::new(GateConfig {
            max_requests,
            window: Duration::from_secs(60),
        })),
        test_withdrawal_config(),
        64,
    )
}

/// Scripted [`ChainClient`].
///
/// Each method pops its queue when non-empty and otherwise falls back to a
/// healthy default: fresh blockhashes, accepted submissions, confirmed
/// statuses, block height 0 and a 100 SOL balance.
pub struct MockChain {
    reference_hashes: Mutex<VecDeque<Result<ReferenceHash, ClientError>>>,
    submits: Mutex<VecDeque<Result<(), ClientError>>>,
    statuses: Mutex<VecDeque<Result<Option<SignatureStatus>, ClientError>>>,
    default_status: Mutex<Option<SignatureStatus>>,
    block_heights: Mutex<VecDeque<Result<u64, ClientError>>>,
    balance: Mutex<Result<u64, ClientError>>,
    health: Mutex<Result<(), ClientError>>,
    next_hash: AtomicU8,
    calls: Mutex<HashMap<&'static str, usize>>,
    submitted: Mutex<Vec<SignedTransaction>>,
    issued: Mutex<Vec<ReferenceHash>>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            reference_hashes: Mutex::new(VecDeque::new()),
            submits: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(VecDeque::new()),
            default_status: Mutex::new(Some(SignatureStatus {
                slot: 1,
                err: None,
                confirmation_status: Some(Commitment::Confirmed),
            })),
            block_heights: Mutex::new(VecDeque::new()),
            balance: Mutex::new(Ok(100 * LAMPORTS_PER_SOL)),
            health: Mutex::new(Ok(())),
            next_hash: AtomicU8::new(1),
            calls: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
            issued: Mutex::new(Vec::new()),
        }
    }

    pub fn push_reference_hash(&self, result: Result<ReferenceHash, ClientError>) {
        self.reference_hashes.lock().unwrap().push_back(result);
    }

    pub fn push_submit(&self, result: Result<(), ClientError>) {
        self.submits.lock().unwrap().push_back(result);
    }

    pub fn push_status(&self, result: Result<Option<SignatureStatus>, ClientError>) {
        self.statuses.lock().unwrap().push_back(result);
    }

    /// Status returned once the status queue is drained.
    pub fn set_default_status(&self, status: Option<SignatureStatus>) {
        *self.default_status.lock().unwrap() = status;
    }

    pub fn push_block_height(&self, result: Result<u64, ClientError>) {
        self.block_heights.lock().unwrap().push_back(result);
    }

    pub fn set_balance(&self, result: Result<u64, ClientError>) {
        *self.balance.lock().unwrap() = result;
    }

    pub fn set_health(&self, result: Result<(), ClientError>) {
        *self.health.lock().unwrap() = result;
    }

    /// Number of calls made to `method`.
    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// Every transaction passed to `submit`, in order.
    pub fn submitted(&self) -> Vec<SignedTransaction> {
        self.submitted.lock().unwrap().clone()
    }

    /// Every reference hash handed out, in order.
    pub fn issued_hashes(&self) -> Vec<ReferenceHash> {
        self.issued.lock().unwrap().clone()
    }

    fn record(&self, method: &'static str) {
        *self.calls.lock().unwrap().entry(method).or_insert(0) += 1;
    }

    fn fresh_hash(&self) -> ReferenceHash {
        let byte = self.next_hash.fetch_add(1, Ordering::Relaxed);
        ReferenceHash {
            blockhash: Hash::new_from_array([byte; 32]),
            last_valid_block_height: 1_000,
        }
    }
}

/// Hash-expiry error as the node reports it during preflight.
pub fn expired_hash_error() -> ClientError {
    ClientError::Remote {
        code: -32002,
        message: "Transaction simulation failed: Blockhash not found".into(),
        kind: FailureKind::HashExpiry,
    }
}

/// Insufficient-funds error as the node reports it during preflight.
pub fn insufficient_funds_error() -> ClientError {
    ClientError::Remote {
        code: -32002,
        message: "Transaction simulation failed: Attempt to debit an account but found no record of a prior credit.".into(),
        kind: FailureKind::InsufficientFunds,
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn latest_reference_hash(
        &self,
        _commitment: Commitment,
    ) -> Result<ReferenceHash, ClientError> {
        self.record("latest_reference_hash");
        let scripted = self.reference_hashes.lock().unwrap().pop_front();
        let result = scripted.unwrap_or_else(|| Ok(self.fresh_hash()));
        if let Ok(hash) = &result {
            self.issued.lock().unwrap().push(*hash);
        }
        result
    }

    async fn balance(
        &self,
        _address: &Pubkey,
        _commitment: Commitment,
    ) -> Result<u64, ClientError> {
        self.record("balance");
        self.balance.lock().unwrap().clone()
    }

    async fn submit(
        &self,
        transaction: &SignedTransaction,
        _options: SubmitOptions,
    ) -> Result<Signature, ClientError> {
        self.record("submit");
        self.submitted.lock().unwrap().push(transaction.clone());
        let scripted = self.submits.lock().unwrap().pop_front();
        scripted.unwrap_or(Ok(())).map(|()| transaction.signature())
    }

    async fn signature_status(
        &self,
        _signature: &Signature,
    ) -> Result<Option<SignatureStatus>, ClientError> {
        self.record("signature_status");
        let scripted = self.statuses.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(self.default_status.lock().unwrap().clone()))
    }

    async fn block_height(&self, _commitment: Commitment) -> Result<u64, ClientError> {
        self.record("block_height");
        self.block_heights.lock().unwrap().pop_front().unwrap_or(Ok(0))
    }

    async fn health(&self) -> Result<(), ClientError> {
        self.record("health");
        self.health.lock().unwrap().clone()
    }

    async fn call_raw(&self, method: &'static str, params: Value) -> Result<Value, ClientError> {
        self.record("call_raw");
        Ok(json!({ "method": method, "params": params }))
    }
}

// =============================================================================
// Stub JSON-RPC node
// =============================================================================

/// Answers one JSON-RPC call given its method and params.
pub type NodeResponder = fn(&str, &Value) -> Response;

/// Methods and API-key header values seen by a stub node, in order.
pub type SeenCalls = Arc<Mutex<Vec<(String, Option<String>)>>>;

#[derive(Clone)]
struct StubNode {
    respond: NodeResponder,
    seen: SeenCalls,
}

async fn stub_handler(
    State(node): State<StubNode>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let method = body["method"].as_str().unwrap_or_default().to_string();
    let key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    node.seen.lock().unwrap().push((method.clone(), key));
    (node.respond)(&method, &body["params"])
}

/// Serve `respond` on an ephemeral local port and return a client for it.
pub async fn spawn_node(respond: NodeResponder) -> (RpcClient, SeenCalls) {
    let seen: SeenCalls = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new().route("/", post(stub_handler)).with_state(StubNode {
        respond,
        seen: seen.clone(),
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = RpcConfig {
        url: format!("http://{addr}/").parse().unwrap(),
        api_key: Some("test-key".into()),
        api_key_header: "x-api-key".into(),
        timeout: Duration::from_secs(5),
    };
    (RpcClient::new(&config).unwrap(), seen)
}

/// A successful JSON-RPC response.
pub fn rpc_result(result: Value) -> Response {
    Json(json!({ "jsonrpc": "2.0", "id": 1, "result": result })).into_response()
}

/// A JSON-RPC error response.
pub fn rpc_error(code: i64, message: &str, data: Value) -> Response {
    Json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": { "code": code, "message": message, "data": data },
    }))
    .into_response()
}

/// Signature of the wire transaction passed to `sendTransaction`.
pub fn submitted_signature(params: &Value) -> String {
    let raw = params[0].as_str().unwrap_or_default();
    let bytes = match params[1]["encoding"].as_str() {
        Some("base64") => Base64::decode_vec(raw).unwrap(),
        _ => bs58::decode(raw).into_vec().unwrap(),
    };
    // A compact-u16 count of one, then the fee payer's signature.
    Signature::try_from(&bytes[1..65]).unwrap().to_string()
}

/// A healthy node: fresh blockhashes, accepted submissions, confirmed statuses.
pub fn healthy_node(method: &str, params: &Value) -> Response {
    let context = json!({ "slot": 5 });
    match method {
        "getVersion" => rpc_result(json!({ "solana-core": "2.1.0", "feature-set": 1 })),
        "getLatestBlockhash" => rpc_result(json!({
            "context": context,
            "value": {
                "blockhash": Hash::new_from_array([3u8; 32]).to_string(),
                "lastValidBlockHeight": 300
            }
        })),
        "getBalance" => rpc_result(json!({ "context": context, "value": 100 * LAMPORTS_PER_SOL })),
        "sendTransaction" => rpc_result(json!(submitted_signature(params))),
        "getSignatureStatuses" => rpc_result(json!({
            "context": context,
            "value": [{
                "slot": 5,
                "confirmations": null,
                "err": null,
                "status": { "Ok": null },
                "confirmationStatus": "confirmed"
            }]
        })),
        "getBlockHeight" => rpc_result(json!(10)),
        "getHealth" => rpc_result(json!("ok")),
        _ => rpc_error(-32601, "Method not found", Value::Null),
    }
}

/// A gateway timeout page in front of the node.
pub fn gateway_timeout() -> Response {
    (
        StatusCode::GATEWAY_TIMEOUT,
        [("content-type", "text/html")],
        "<html><body><h1>504 Gateway Time-out</h1></body></html>",
    )
        .into_response()
}
