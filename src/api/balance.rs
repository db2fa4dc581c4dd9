// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Read-only chain queries: balances and the latest reference hash.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    blockchain::{
        transactions::format_amount,
        types::{Pubkey, SOL_DECIMALS},
    },
    error::ApiError,
    state::AppState,
};

/// Query parameters for balance request.
#[derive(Debug, Deserialize, IntoParams)]
pub struct BalanceQuery {
    /// Account address (base58). Defaults to the pool.
    pub address: Option<String>,
}

/// Balance response.
#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceResponse {
    pub ok: bool,
    pub address: String,
    /// Balance in lamports.
    pub lamports: u64,
    /// Balance in SOL.
    pub sol: String,
}

/// Latest reference hash response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BlockhashResponse {
    pub ok: bool,
    pub blockhash: String,
    /// Block height after which transactions built on `blockhash` are rejected.
    pub last_valid_block_height: u64,
}

/// Get the lamport balance of an account.
#[utoipa::path(
    get,
    path = "/balance",
    tag = "Chain",
    params(BalanceQuery),
    responses(
        (status = 200, description = "Balance retrieved successfully", body = BalanceResponse),
        (status = 400, description = "Invalid address", body = crate::error::ErrorBody),
        (status = 502, description = "Node unavailable", body = crate::error::ErrorBody)
    )
)]
pub async fn get_balance(
    State(state): State<AppState>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let address = match query.address.as_deref().map(str::trim) {
        None | Some("") => state.pool,
        Some(raw) => raw.parse::<Pubkey>().map_err(|e| {
            ApiError::bad_request("invalid_address", format!("address is invalid: {e}"))
        })?,
    };

    let lamports = state.chain.balance(&address, state.read_commitment).await?;

    Ok(Json(BalanceResponse {
        ok: true,
        address: address.to_string(),
        lamports,
        sol: format_amount(lamports, SOL_DECIMALS),
    }))
}

/// Get the latest reference hash.
#[utoipa::path(
    get,
    path = "/blockhash",
    tag = "Chain",
    responses(
        (status = 200, description = "Latest blockhash", body = BlockhashResponse),
        (status = 502, description = "Node unavailable", body = crate::error::ErrorBody)
    )
)]
pub async fn get_blockhash(
    State(state): State<AppState>,
) -> Result<Json<BlockhashResponse>, ApiError> {
    let reference = state
        .chain
        .latest_reference_hash(state.read_commitment)
        .await?;

    Ok(Json(BlockhashResponse {
        ok: true,
        blockhash: reference.blockhash.to_string(),
        last_valid_block_height: reference.last_valid_block_height,
    }))
}
