// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{error::Error, sync::Arc};

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use iam_server::{
    api::router,
    auth::{PasswordHasher, PasswordPolicy, TokenService},
    config::{Config, LogFormat, StorageLocation, DEFAULT_LOG_FILTER},
    shutdown::shutdown_signal,
    state::AppState,
    storage::{CredentialStore, InMemoryStore, RedbStore},
};

fn init_logging(format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().flatten_event(true).with_current_span(false))
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    init_logging(config.log_format);
    info!(?config, "Starting IAM server");

    let hasher = PasswordHasher::new(PasswordPolicy::default(), config.hash_concurrency);
    let store: Arc<dyn CredentialStore> = match &config.storage {
        StorageLocation::Memory => Arc::new(InMemoryStore::new(hasher)),
        StorageLocation::File(path) => Arc::new(RedbStore::open(path, hasher)?),
    };

    let keys = config.token_keys()?;
    info!(
        backend = store.backend(),
        can_sign = keys.can_sign(),
        can_verify = keys.can_verify(),
        "Credential store and token keys loaded"
    );

    let state = AppState::new(store, TokenService::new(keys, config.token_expiration));
    let app = router(state, config.request_timeout);

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "IAM server listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("IAM server stopped");
    Ok(())
}
