// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier serve`: open the store and keep it tidy until shutdown.
//!
//! The hub's transports are separate processes; this command owns the
//! database lifecycle and the expiry sweeper.

use std::sync::Arc;

use chrono::Utc;
use courier_config::model::CourierConfig;
use courier_core::{CourierError, DeliveryStore, HealthStatus, PluginAdapter};
use courier_delivery::ExpirySweeper;
use courier_storage::SqliteStore;
use tracing::{info, warn};

use crate::shutdown;

/// Open (and migrate) the configured store.
pub async fn open_store(config: &CourierConfig) -> Result<Arc<SqliteStore>, CourierError> {
    let store = SqliteStore::new(config.storage.clone());
    store.initialize().await?;
    Ok(Arc::new(store))
}

/// Run until SIGINT/SIGTERM, sweeping expired messages on the configured interval.
pub async fn run_serve(config: CourierConfig) -> Result<(), CourierError> {
    init_tracing(&config.hub.log_level);
    info!(
        hub = %config.hub.name,
        database = %config.storage.database_path,
        "starting courier"
    );

    let store = open_store(&config).await?;
    match store.health_check().await? {
        HealthStatus::Healthy => {}
        HealthStatus::Degraded(reason) => warn!(%reason, "store degraded at startup"),
        HealthStatus::Unhealthy(reason) => {
            return Err(CourierError::Internal(format!(
                "store unhealthy at startup: {reason}"
            )));
        }
    }

    let stats = store.delivery_stats(Utc::now()).await?;
    info!(
        messages = stats.messages,
        pending = stats.pending,
        leased = stats.leased,
        "store opened"
    );

    let cancel = shutdown::install_signal_handler();

    if config.sweeper.enabled {
        let sweeper = ExpirySweeper::new(store.clone(), &config.sweeper);
        sweeper.run(cancel.clone()).await;
    } else {
        info!("expiry sweeper disabled");
        cancel.cancelled().await;
    }

    store.shutdown().await?;
    info!("courier stopped");
    Ok(())
}

/// Install the global fmt subscriber. `RUST_LOG` overrides `log_level`.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("courier={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
