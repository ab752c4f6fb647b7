// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tracing_subscriber::EnvFilter;

use store_auth_server::{
    api::router,
    config::{AppConfig, Environment, LogFormat, DEFAULT_LOG_FILTER, RECOMMENDED_SECRET_LEN},
    state::AppState,
    storage::AuthDatabase,
};

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn shutdown_signal(handle: Handle<SocketAddr>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    tracing::warn!("Received Ctrl+C, initiating graceful shutdown...");
    handle.graceful_shutdown(Some(std::time::Duration::from_secs(10)));
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_environment(&Environment::system())?;
    init_tracing(config.log_format);
    tracing::info!(?config, "Configuration loaded");

    if config.jwt_secret.len() < RECOMMENDED_SECRET_LEN {
        tracing::warn!(
            "JWT secret is shorter than {RECOMMENDED_SECRET_LEN} bytes; use a longer secret for HS512"
        );
    }

    let db = AuthDatabase::open(&config.database_path())?;
    tracing::info!(path = %config.database_path().display(), "Credential database opened");

    let state = AppState::new(db, config.clone());
    if let Some(seed) = &config.seed_admin {
        state.seed_admin(seed)?;
    }

    let app = router(state);
    let addr: SocketAddr = config.bind_address().parse()?;

    let handle: Handle<SocketAddr> = Handle::new();
    tokio::spawn(shutdown_signal(handle.clone()));

    match &config.tls {
        Some(tls) => {
            // Install the ring crypto provider before any TLS operation.
            rustls::crypto::ring::default_provider()
                .install_default()
                .map_err(|_| "failed to install rustls crypto provider")?;

            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;
            tracing::info!("Store auth server listening on https://{addr} (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            tracing::info!("Store auth server listening on http://{addr} (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}
