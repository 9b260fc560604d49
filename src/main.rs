// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;

use paylink_verifier::{
    api::router,
    config::{NonceStoreKind, ServiceConfig},
    logging::{init_logging, DEFAULT_LOG_FILTER},
    state::AppState,
    storage::NonceSweeper,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(DEFAULT_LOG_FILTER, config.log_format);

    let state = AppState::from_config(&config)
        .await
        .expect("Failed to open nonce store");
    match config.nonce_store {
        NonceStoreKind::Memory => {
            warn!("NONCE_STORE=memory: replay protection is process-local (degraded mode)")
        }
        NonceStoreKind::Redb => {
            info!("NONCE_STORE=redb: replay protection covers this instance only; use redis for replicas")
        }
        NonceStoreKind::Redis => {}
    }
    info!(
        allowed_domains = ?config.verifier.allowed_domains,
        nonce_store = state.nonce_store.scope().as_str(),
        nonce_ttl_secs = config.verifier.nonce_ttl.as_secs(),
        max_validity_secs = config.verifier.max_validity.as_secs(),
        "Verifier configured"
    );

    let shutdown = CancellationToken::new();
    let sweeper = NonceSweeper::new(state.nonce_store.clone())
        .with_rate_limiter(state.rate_limiter.clone())
        .with_interval(config.sweep_interval);
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown.clone()));

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Failed to parse bind address");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");

    info!(%addr, "Paylink verifier listening (docs at /docs)");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            server_shutdown.cancel();
        })
        .await
        .expect("HTTP server failed");

    shutdown.cancel();
    let _ = sweeper_handle.await;
    info!("Shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
