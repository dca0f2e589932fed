// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;
use std::time::Duration;

use axum_server::{tls_rustls::RustlsConfig, Handle};
use expense_vault_server::{
    api::router,
    auth::{DelegationError, DelegationMinter},
    config::{AppConfig, ConfigError, LogFormat, VAULT_BASE_URL_ENV},
    state::AppState,
    storage::{IdentifierLedger, LedgerStore},
    telemetry::init_tracing,
    vault::{HttpVaultClient, VaultBackend, VaultError},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// How long in-flight requests may run after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to load application key: {0}")]
    Delegation(#[from] DelegationError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(LogFormat::default());
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.log_format);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> Result<(), StartupError> {
    let minter = DelegationMinter::from_key_material(&config.app_private_key, &config.user_did)?;
    info!(
        app_did = %minter.issuer_did(),
        user_did = %minter.user_did(),
        "Delegation minter ready"
    );

    let vault = match &config.vault_base_url {
        Some(base_url) => VaultBackend::Http(HttpVaultClient::new(
            base_url,
            config.collection.clone(),
            config.vault_timeout,
        )?),
        None => {
            warn!(
                "{VAULT_BASE_URL_ENV} is not set, using the in-memory vault; records are lost on restart"
            );
            VaultBackend::memory(config.collection.clone(), minter.verifying_key().clone())
        }
    };
    match &vault {
        VaultBackend::Http(client) => info!(
            backend = vault.kind(),
            base_url = %client.base_url(),
            collection = %vault.collection(),
            "Vault backend ready"
        ),
        VaultBackend::Memory(_) => {
            info!(backend = vault.kind(), collection = %vault.collection(), "Vault backend ready")
        }
    }

    let ledger = IdentifierLedger::load(
        LedgerStore::file(config.ledger_path.clone()),
        config.persist_policy,
    );
    info!(
        path = ?ledger.store().path(),
        tracked = ledger.len().await,
        policy = %ledger.policy(),
        "Ledger loaded"
    );

    let app = router(AppState::new(ledger, vault, minter));
    let addr = config.bind_addr()?;

    let shutdown = CancellationToken::new();
    let handle = Handle::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));
    tokio::spawn({
        let handle = handle.clone();
        let shutdown = shutdown.clone();
        async move {
            shutdown.cancelled().await;
            info!(grace_secs = SHUTDOWN_GRACE.as_secs(), "Shutting down");
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        }
    });

    match &config.tls {
        Some(tls) => {
            // Another component may already have installed a provider.
            let _ = rustls::crypto::ring::default_provider().install_default();
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key)
                .await
                .map_err(|e| StartupError::Tls(format!("{}: {e}", tls.cert.display())))?;

            info!("Expense vault server listening on https://{addr} (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            info!("Expense vault server listening on http://{addr} (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM.
async fn wait_for_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
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
                error!(error = %e, "Failed to listen for SIGTERM");
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
    shutdown.cancel();
}
