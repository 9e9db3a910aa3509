// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use artisan_market_server::{
    api::router,
    auth::{CookieSettings, TokenCodec},
    config::{LogFormat, ServerConfig, USERS_DB_FILE},
    session::RefreshTokenSweeper,
    state::AppState,
    storage::{InMemoryUserStore, RedbUserStore, UserStore},
};
use axum_server::tls_rustls::RustlsConfig;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn open_store(config: &ServerConfig) -> Result<Arc<dyn UserStore>, Box<dyn std::error::Error>> {
    match &config.data_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let path = dir.join(USERS_DB_FILE);
            let store = RedbUserStore::open(&path)?;
            info!(path = %path.display(), "Opened user database");
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATA_DIR not set; accounts are kept in memory and lost on restart");
            Ok(Arc::new(InMemoryUserStore::new()))
        }
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
        _ = shutdown.cancelled() => {},
    }

    info!("Shutdown signal received");
    shutdown.cancel();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;
    init_tracing(config.log_format);

    let store = open_store(&config)?;
    let codec = TokenCodec::new(&config.access_token, &config.refresh_token)?;
    let state = AppState::new(
        store,
        codec,
        config.email_policy,
        CookieSettings {
            secure: config.cookie_secure,
        },
    );
    if !config.cookie_secure {
        warn!("COOKIE_SECURE is off; session cookies will be sent over plain HTTP");
    }

    let shutdown = CancellationToken::new();
    let sweeper = RefreshTokenSweeper::new(state.sessions.clone(), config.sweep_interval);
    let sweeper_task = tokio::spawn(sweeper.run(shutdown.clone()));

    let app = router(state, config.cors_origin.as_deref());
    let addr = config.bind_addr;

    match &config.tls {
        Some(tls) => {
            // Install the ring crypto provider for rustls (must be done before any TLS operations)
            if rustls::crypto::ring::default_provider()
                .install_default()
                .is_err()
            {
                warn!("A rustls crypto provider was already installed");
            }
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;

            let handle = axum_server::Handle::new();
            let graceful = handle.clone();
            let signal = shutdown.clone();
            tokio::spawn(async move {
                shutdown_signal(signal).await;
                graceful.graceful_shutdown(Some(Duration::from_secs(10)));
            });

            info!(%addr, "Artisan market server listening on https://{addr} (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!(%addr, "Artisan market server listening on http://{addr} (docs at /docs)");
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
                .await?;
        }
    }

    shutdown.cancel();
    if let Err(e) = sweeper_task.await {
        warn!(error = %e, "Refresh token sweeper task failed");
    }
    info!("Server stopped");
    Ok(())
}
