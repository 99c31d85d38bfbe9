// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, process, sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use chrono::Utc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bookshelf_server::{
    api::router,
    auth::{Identity, IdentityStore, InMemoryIdentityStore, SystemClock},
    config::{AppConfig, LogFormat, SeedIdentity, DEFAULT_LOG_FILTER},
    state::AppState,
};

/// How long in-flight requests get to finish after Ctrl-C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            process::exit(1);
        }
    };

    init_tracing(config.log_format);

    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let store = Arc::new(InMemoryIdentityStore::new());
    if let Some(seed) = &config.seed {
        let identity = store.insert(seed_identity(seed)).await;
        if let Some(password) = &seed.password {
            if let Err(e) = store.set_password(&identity.id, password.as_str()).await {
                error!(error = %e, "failed to set seed identity password");
                process::exit(1);
            }
        }
        info!(
            user_id = %identity.id,
            role = %identity.role,
            login = seed.password.is_some(),
            "seed identity inserted"
        );
    }

    let identities: Arc<dyn IdentityStore> = store;
    let state = match AppState::new(&config.auth, identities, Arc::new(SystemClock)) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "invalid access policy");
            process::exit(1);
        }
    };

    #[cfg(feature = "dev")]
    log_dev_token(&state, config.seed.as_ref());

    info!(
        routes = state.authorizer.policy().route_count(),
        token_ttl_secs = config.auth.token_ttl.as_secs(),
        "access policy loaded"
    );

    let app = router(state);

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!(error = %e, host = %config.host, port = config.port, "invalid bind address");
            process::exit(1);
        }
    };

    let handle = Handle::<SocketAddr>::new();
    tokio::spawn(shutdown_on_ctrl_c(handle.clone()));

    let served = match &config.tls {
        Some(tls) => {
            let tls_config = match RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await
            {
                Ok(tls_config) => tls_config,
                Err(e) => {
                    error!(error = %e, "failed to load TLS certificate or key");
                    process::exit(1);
                }
            };
            info!("Bookshelf server listening on https://{addr} (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
        None => {
            info!("Bookshelf server listening on http://{addr} (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
    };

    if let Err(e) = served {
        error!(error = %e, "server failed");
        process::exit(1);
    }
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

fn seed_identity(seed: &SeedIdentity) -> Identity {
    Identity {
        id: seed.id.clone(),
        name: seed.email.clone(),
        email: seed.email.clone(),
        role: seed.role,
        is_active: true,
        created_at: Utc::now(),
    }
}

/// Log a token for the seed identity so it can be used right away.
#[cfg(feature = "dev")]
fn log_dev_token(state: &AppState, seed: Option<&SeedIdentity>) {
    let Some(seed) = seed else { return };
    match state.codec().issue_default(&seed.id) {
        Ok(token) => tracing::warn!(user_id = %seed.id, %token, "dev token for seed identity"),
        Err(e) => error!(error = %e, "failed to issue dev token"),
    }
}

async fn shutdown_on_ctrl_c(handle: Handle<SocketAddr>) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received, draining connections");
        handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_server::auth::Role;

    #[tokio::test]
    async fn shutdown_watcher_takes_the_server_handle() {
        let handle = Handle::<SocketAddr>::new();
        let watcher = tokio::spawn(shutdown_on_ctrl_c(handle.clone()));
        watcher.abort();
        assert!(watcher.await.unwrap_err().is_cancelled());
    }

    #[test]
    fn seed_identity_is_active_and_named_after_email() {
        let identity = seed_identity(&SeedIdentity {
            id: "user_1".to_string(),
            email: "seed@localhost".to_string(),
            role: Role::Admin,
            password: None,
        });
        assert_eq!(identity.id, "user_1");
        assert_eq!(identity.name, "seed@localhost");
        assert!(identity.is_active);
    }
}
