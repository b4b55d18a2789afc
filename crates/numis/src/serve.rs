// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `numis serve` command implementation.
//!
//! Opens SQLite storage, picks the payment client, rebuilds timers and
//! pending archival from durable state, then serves the gateway until a
//! shutdown signal arrives.

use std::sync::Arc;

use numis_config::model::NumisConfig;
use numis_core::{NumisError, PluginAdapter, StorageAdapter};
use numis_gateway::{GatewayState, ServerConfig};
use numis_session::{payment_from_config, AuthService};
use numis_storage::SqliteStorage;
use tracing::{info, warn};

use crate::shutdown;

pub async fn run_serve(config: NumisConfig) -> Result<(), NumisError> {
    init_tracing(&config.service.log_level);

    info!(name = %config.service.name, "starting numis serve");

    let storage = {
        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        Arc::new(storage)
    };

    let payment = payment_from_config(&config.payment)?;
    info!(payment = payment.name(), "payment collaborator ready");

    let service = Arc::new(AuthService::from_config(
        &config,
        storage.clone(),
        payment,
        Some(storage.clone()),
    )?);

    // Crash recovery: re-arm session timers and finish interrupted archival.
    service.recover().await?;

    let cancel = shutdown::install_signal_handler();

    let served = if config.gateway.enabled {
        if config.gateway.bearer_token.is_none() {
            warn!("gateway.bearer_token is not set; every API request will be rejected");
        }
        let state = GatewayState::new(service.clone(), config.gateway.bearer_token.clone());
        numis_gateway::start_server(&ServerConfig::from(&config.gateway), state, cancel.clone())
            .await
    } else {
        info!("gateway disabled; waiting for shutdown signal");
        cancel.cancelled().await;
        Ok(())
    };

    service.shutdown().await?;
    info!("numis serve shutdown complete");
    served
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("numis={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
