// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum_server::tls_rustls::RustlsConfig;
use relational_pool_relay::{
    api::router,
    blockchain::RpcClient,
    config::{LogFormat, RelayConfig},
    custody::PoolCredential,
    state::AppState,
    withdrawal::RateGate,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Upper bound on waiting for in-flight withdrawals after the listener stops.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(90);

#[tokio::main]
async fn main() {
    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(LogFormat::Pretty);
            error!(error = %e, "FATAL: invalid configuration");
            std::process::exit(1);
        }
    };
    init_tracing(config.log_format);

    let credential = match PoolCredential::load(&config.custody) {
        Ok(credential) => Arc::new(credential),
        Err(e) => {
            error!(error = %e, "FATAL: pool credential unavailable");
            std::process::exit(1);
        }
    };

    let chain = match RpcClient::new(&config.rpc) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!(error = %e, "FATAL: could not build RPC client");
            std::process::exit(1);
        }
    };
    info!(rpc = %chain.url(), "RPC client ready");

    let gate = Arc::new(RateGate::new(config.gate));
    info!(
        max_requests = config.gate.max_requests,
        window_secs = config.gate.window.as_secs(),
        "Withdrawal rate gate configured"
    );

    let state = AppState::new(
        credential,
        chain,
        gate,
        config.withdrawal.clone(),
        config.journal_capacity,
    );
    let tasks = state.tasks.clone();
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Failed to parse bind address");

    match &config.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
                .await
                .expect("Failed to load TLS certificate and key");

            let handle = axum_server::Handle::new();
            let shutdown = handle.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                shutdown.graceful_shutdown(Some(Duration::from_secs(30)));
            });

            info!(%addr, "Pool relay listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .expect("HTTPS server failed");
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .expect("Failed to bind listener");

            info!(%addr, "Pool relay listening on http (docs at /docs)");
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .expect("HTTP server failed");
        }
    }

    tasks.close();
    info!(in_flight = tasks.len(), "Listener stopped, draining withdrawals");
    if tokio::time::timeout(DRAIN_TIMEOUT, tasks.wait()).await.is_err() {
        warn!(
            remaining = tasks.len(),
            "Drain timeout; remaining withdrawals may be unconfirmed"
        );
    }

    info!("Pool relay shut down");
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
