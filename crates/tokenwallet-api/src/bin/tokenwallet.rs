use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokenwallet_api::{AppState, build_router, config, logging};
use tokenwallet_ledger::WalletService;
use tokenwallet_types::{Result, WalletError, constants};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_logging();
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "tokenwallet stopped with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = config::load()?;
    let service = Arc::new(WalletService::new(config.wallet.clone())?);
    if config.tokens.is_empty() {
        warn!("no bearer tokens configured; user endpoints will reject every request");
    }
    if config.internal_token.is_none() {
        warn!("no internal token configured; /internal endpoints are closed");
    }

    let state = AppState::from_config(service, &config);
    let router = build_router(state, Duration::from_millis(config.request_timeout_ms));

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .map_err(|e| WalletError::Network(format!("failed to bind {}: {e}", config.listen_addr)))?;
    info!(
        service = constants::SERVICE_NAME,
        version = constants::VERSION,
        addr = %config.listen_addr,
        receive_policy = ?config.wallet.receive_policy,
        "listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| WalletError::Network(format!("server error: {e}")))?;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
