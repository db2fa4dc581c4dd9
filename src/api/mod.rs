// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Body,
    http::Request,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    blockchain::types::Commitment,
    error::ErrorBody,
    state::AppState,
    withdrawal::{WithdrawalRecord, WithdrawalRequest, WithdrawalState},
};

pub mod balance;
pub mod health;
pub mod rpc_proxy;
pub mod withdraw;

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/balance", get(balance::get_balance))
        .route("/blockhash", get(balance::get_blockhash))
        .route("/withdraw", post(withdraw::withdraw))
        // Legacy aliases kept for existing clients.
        .route("/relay", post(withdraw::withdraw))
        .route("/relay-withdraw", post(withdraw::withdraw))
        .route("/withdrawals/{request_id}", get(withdraw::get_withdrawal))
        .route("/rpc", post(rpc_proxy::proxy))
        .with_state(state);

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        tracing::info_span!(
            "http",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    });

    routes
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(trace)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        balance::get_balance,
        balance::get_blockhash,
        withdraw::withdraw,
        withdraw::get_withdrawal,
        rpc_proxy::proxy
    ),
    components(
        schemas(
            health::HealthResponse,
            health::LivenessResponse,
            balance::BalanceResponse,
            balance::BlockhashResponse,
            withdraw::WithdrawResponse,
            withdraw::WithdrawalStatusResponse,
            rpc_proxy::RpcProxyRequest,
            WithdrawalRequest,
            WithdrawalRecord,
            WithdrawalState,
            Commitment,
            ErrorBody
        )
    ),
    tags(
        (name = "Health", description = "Service and node health"),
        (name = "Chain", description = "Read-only chain queries"),
        (name = "Withdrawals", description = "Pool payouts")
    )
)]
struct ApiDoc;
