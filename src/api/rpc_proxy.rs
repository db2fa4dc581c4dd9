// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Read-only JSON-RPC passthrough for the frontend.
//!
//! Only methods in [`READ_ONLY_METHODS`] are forwarded, so the proxy can
//! never be used to submit transactions through the relay's node credential.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use utoipa::ToSchema;

use crate::{blockchain::client::ClientError, error::ApiError, state::AppState};

/// Methods the proxy forwards.
pub const READ_ONLY_METHODS: &[&str] = &[
    "getBalance",
    "getLatestBlockhash",
    "getSignatureStatuses",
    "getBlockHeight",
    "getSlot",
    "getAccountInfo",
    "getTransaction",
    "getMinimumBalanceForRentExemption",
    "getFeeForMessage",
    "getHealth",
    "getVersion",
    "getEpochInfo",
];

/// JSON-RPC request body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RpcProxyRequest {
    /// Echoed back in the response.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub id: Value,
    #[schema(example = "getBalance")]
    pub method: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub params: Value,
}

/// Forward a read-only JSON-RPC call to the node.
///
/// Node errors are returned as a JSON-RPC `error` member with status 200;
/// transport failures are 502.
#[utoipa::path(
    post,
    path = "/rpc",
    tag = "Chain",
    request_body = RpcProxyRequest,
    responses(
        (status = 200, description = "JSON-RPC response from the node"),
        (status = 400, description = "Method not allowed or malformed body", body = crate::error::ErrorBody),
        (status = 502, description = "Node unavailable", body = crate::error::ErrorBody)
    )
)]
pub async fn proxy(
    State(state): State<AppState>,
    payload: Result<Json<RpcProxyRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) =
        payload.map_err(|e| ApiError::bad_request("invalid_body", e.body_text()))?;

    let method = READ_ONLY_METHODS
        .iter()
        .copied()
        .find(|allowed| *allowed == request.method)
        .ok_or_else(|| {
            ApiError::bad_request(
                "method_not_allowed",
                format!("method `{}` is not available through the proxy", request.method),
            )
        })?;

    let params = match request.params {
        Value::Null => json!([]),
        other => other,
    };
    debug!(method, "Proxying RPC call");

    match state.chain.call_raw(method, params).await {
        Ok(result) => Ok(Json(json!({
            "jsonrpc": "2.0",
            "id": request.id,
            "result": result,
        }))),
        Err(ClientError::Remote { code, message, .. }) => Ok(Json(json!({
            "jsonrpc": "2.0",
            "id": request.id,
            "error": { "code": code, "message": message },
        }))),
        Err(e) => Err(e.into()),
    }
}
