// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Expiry sweeper: purges messages whose deadline has passed.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use courier_config::model::SweeperConfig;
use courier_core::{CourierError, DeliveryStore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Time-triggered purge of expired messages.
pub struct ExpirySweeper {
    store: Arc<dyn DeliveryStore>,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(store: Arc<dyn DeliveryStore>, config: &SweeperConfig) -> Self {
        Self {
            store,
            interval: Duration::from_secs(config.interval_secs.max(1)),
        }
    }

    /// Purge once. Returns the number of messages deleted; a second call
    /// right after returns zero.
    pub async fn purge_expired(&self) -> Result<u64, CourierError> {
        let deleted = self.store.purge_expired(Utc::now()).await?;
        if deleted > 0 {
            info!(deleted, "expired messages purged");
        } else {
            debug!("no expired messages");
        }
        Ok(deleted)
    }

    /// Purge on every interval tick, starting immediately, until `cancel`
    /// fires. Failures are logged and the next tick tries again.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs(), "expiry sweeper started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.purge_expired().await {
                        warn!(error = %e, "expiry sweep failed (will retry)");
                    }
                }
                _ = cancel.cancelled() => {
                    info!("expiry sweeper shutting down");
                    break;
                }
            }
        }
    }
}
