// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Withdrawal endpoints.
//!
//! The orchestrator runs on a tracked task detached from the request. The
//! handler waits for it, but a client that disconnects does not cancel it:
//! the withdrawal still reaches a terminal state and its record stays in the
//! journal under `requestId`.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    blockchain::types::Commitment,
    error::ApiError,
    state::AppState,
    withdrawal::{Admission, Finality, WithdrawalError, WithdrawalRecord, WithdrawalRequest},
};

/// Successful withdrawal response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawResponse {
    pub ok: bool,
    pub request_id: Uuid,
    /// Transaction signature (base58).
    pub signature: String,
    /// "confirmed" or "unconfirmed".
    pub status: String,
    /// Commitment reached, or last observed when unconfirmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commitment: Option<Commitment>,
    pub lamports: u64,
    /// Present when the transfer was rebuilt after its reference hash expired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,
    /// Caveat for unconfirmed withdrawals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Withdrawal record response.
#[derive(Debug, Serialize, ToSchema)]
pub struct WithdrawalStatusResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub withdrawal: WithdrawalRecord,
}

const UNCONFIRMED_NOTE: &str = "Transaction was broadcast but not confirmed in time. \
It may still land; check the signature before retrying.";

/// Pay out from the pool to a recipient.
///
/// Also served at `/relay` and `/relay-withdraw`.
#[utoipa::path(
    post,
    path = "/withdraw",
    tag = "Withdrawals",
    request_body = WithdrawalRequest,
    responses(
        (status = 200, description = "Withdrawal sent", body = WithdrawResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorBody),
        (status = 409, description = "Rate limited, duplicate reference, expired hash or insufficient pool funds", body = crate::error::ErrorBody),
        (status = 502, description = "Node or network failure", body = crate::error::ErrorBody)
    )
)]
pub async fn withdraw(
    State(state): State<AppState>,
    payload: Result<Json<WithdrawalRequest>, JsonRejection>,
) -> Result<Json<WithdrawResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|e| ApiError::bad_request("invalid_body", e.body_text()))?;

    if let Admission::Denied { retry_after } = state.gate.admit() {
        warn!(retry_after_ms = retry_after.as_millis() as u64, "Withdrawal rejected by rate gate");
        return Err(ApiError::rate_limited(retry_after));
    }

    let request_id = Uuid::new_v4();
    let orchestrator = state.orchestrator.clone();
    let task = state
        .tasks
        .spawn(async move { orchestrator.execute(request_id, request).await });

    let outcome = task
        .await
        .unwrap_or_else(|e| {
            error!(%request_id, error = %e, "Withdrawal task did not complete");
            Err(WithdrawalError::Internal(format!(
                "withdrawal {request_id} did not complete"
            )))
        })?;

    let (status, commitment, note) = match outcome.finality {
        Finality::Confirmed(commitment) => ("confirmed", Some(commitment), None),
        Finality::Unconfirmed { last_seen } => {
            ("unconfirmed", last_seen, Some(UNCONFIRMED_NOTE.to_string()))
        }
    };

    Ok(Json(WithdrawResponse {
        ok: true,
        request_id: outcome.request_id,
        signature: outcome.signature.to_string(),
        status: status.to_string(),
        commitment,
        lamports: outcome.lamports,
        retry: (outcome.rebuilds > 0).then_some(outcome.rebuilds),
        note,
    }))
}

/// Look up a withdrawal by request id.
#[utoipa::path(
    get,
    path = "/withdrawals/{request_id}",
    tag = "Withdrawals",
    params(
        ("request_id" = String, Path, description = "Request id returned by /withdraw")
    ),
    responses(
        (status = 200, description = "Withdrawal found", body = WithdrawalStatusResponse),
        (status = 400, description = "Malformed request id", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown or evicted request id", body = crate::error::ErrorBody)
    )
)]
pub async fn get_withdrawal(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<WithdrawalStatusResponse>, ApiError> {
    let request_id: Uuid = request_id
        .parse()
        .map_err(|_| ApiError::bad_request("invalid_request_id", "request id must be a UUID"))?;

    let withdrawal = state
        .journal
        .get(&request_id)
        .ok_or_else(|| ApiError::not_found(format!("withdrawal {request_id} not found")))?;

    Ok(Json(WithdrawalStatusResponse { ok: true, withdrawal }))
}
