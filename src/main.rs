// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use invoicing_rust_server::{
    api::router,
    auth::{AuthResolver, FirebaseProvider, HmacSessionVerifier, IdentityResolver, JwksManager},
    config::AppConfig,
    jwks_refresher::JwksRefresher,
    state::AppState,
    storage::{IdentityStore, UserDatabase},
    telemetry,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    telemetry::init_tracing(config.log_format);
    telemetry::init_panic_hook();
    config.warn_insecure_defaults();

    tracing::info!(env = ?config.app_env, addr = %config.addr, "starting invoicing API");

    std::fs::create_dir_all(&config.data_dir)?;
    let db_path = config.identity_db_path();
    let database = UserDatabase::open(&db_path)?;
    tracing::info!(path = %db_path.display(), users = database.count_users()?, "identity store opened");
    let identities: Arc<dyn IdentityStore> = Arc::new(database);

    let jwks = JwksManager::new(config.firebase_jwks_url.as_str())?;
    let provider = FirebaseProvider::new(&config.firebase_project_id, jwks.clone());
    let sessions = HmacSessionVerifier::new(&config.jwt_secret);
    let resolver = AuthResolver::new(
        Arc::new(provider),
        Arc::new(sessions),
        IdentityResolver::new(identities.clone()),
    );

    let state = AppState::new(resolver, identities).with_jwks(jwks.clone());
    let app = router(state);

    let shutdown = CancellationToken::new();
    let refresher = JwksRefresher::new(jwks).with_interval(config.jwks_refresh_interval);
    let refresher_handle = tokio::spawn(refresher.run(shutdown.clone()));

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening (docs at /docs)");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            server_shutdown.cancel();
        })
        .await?;

    shutdown.cancel();
    let _ = refresher_handle.await;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
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
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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

    tracing::info!("shutdown signal received");
}
