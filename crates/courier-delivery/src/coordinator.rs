// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lease/claim coordinator: the consumer-facing side of delivery.
//!
//! Requests are validated and bounded here, then handed to the store, which
//! performs each lease transition as a single conditional write. The clock
//! is read once per call.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use courier_config::model::DeliveryConfig;
use courier_core::{ClaimFilter, ClaimedMessage, CourierError, DeliveryStore};
use tracing::debug;

/// Validates lease requests and drives claim, ack, nack, and renew.
pub struct LeaseCoordinator {
    store: Arc<dyn DeliveryStore>,
    default_lease_secs: u64,
    max_lease_secs: u64,
    max_claim_batch: usize,
}

impl LeaseCoordinator {
    pub fn new(store: Arc<dyn DeliveryStore>, config: &DeliveryConfig) -> Self {
        Self {
            store,
            default_lease_secs: config.default_lease_secs,
            max_lease_secs: config.max_lease_secs,
            max_claim_batch: config.max_claim_batch,
        }
    }

    /// Lease up to `limit` pending receipts for `agent_id`.
    ///
    /// `limit` is capped at the configured batch size. `lease_secs` defaults
    /// to the configured lease length. A result shorter than `limit` is
    /// normal: candidates lost to concurrent claimants are skipped.
    pub async fn claim(
        &self,
        agent_id: &str,
        limit: usize,
        filter: &ClaimFilter,
        lease_secs: Option<u64>,
    ) -> Result<Vec<ClaimedMessage>, CourierError> {
        require_agent(agent_id)?;
        if limit == 0 {
            return Err(CourierError::Validation(
                "claim limit must be at least 1".into(),
            ));
        }
        let limit = limit.min(self.max_claim_batch);
        let lease = self.lease(lease_secs)?;

        let claimed = self
            .store
            .claim(agent_id, limit, filter, lease, Utc::now())
            .await?;
        debug!(
            agent_id = %agent_id,
            limit,
            claimed = claimed.len(),
            lease_secs = lease.as_secs(),
            "claim served"
        );
        Ok(claimed)
    }

    /// Resolve a lease as delivered, or read when `mark_read` is set.
    pub async fn ack(
        &self,
        message_id: &str,
        agent_id: &str,
        token: &str,
        mark_read: bool,
    ) -> Result<(), CourierError> {
        self.store
            .ack(message_id, agent_id, token, mark_read, Utc::now())
            .await?;
        debug!(message_id = %message_id, agent_id = %agent_id, mark_read, "ack");
        Ok(())
    }

    /// Give a lease back. The receipt is claimable again immediately.
    pub async fn nack(
        &self,
        message_id: &str,
        agent_id: &str,
        token: &str,
        reason: Option<&str>,
    ) -> Result<(), CourierError> {
        self.store
            .nack(message_id, agent_id, token, reason, Utc::now())
            .await?;
        debug!(message_id = %message_id, agent_id = %agent_id, reason, "nack");
        Ok(())
    }

    /// Extend a held lease; the token and attempt count are unchanged.
    pub async fn renew(
        &self,
        message_id: &str,
        agent_id: &str,
        token: &str,
        lease_secs: Option<u64>,
    ) -> Result<DateTime<Utc>, CourierError> {
        let lease = self.lease(lease_secs)?;
        self.store
            .renew(message_id, agent_id, token, lease, Utc::now())
            .await
    }

    fn lease(&self, lease_secs: Option<u64>) -> Result<Duration, CourierError> {
        let secs = lease_secs.unwrap_or(self.default_lease_secs);
        if secs == 0 {
            return Err(CourierError::Validation(
                "lease seconds must be at least 1".into(),
            ));
        }
        if secs > self.max_lease_secs {
            return Err(CourierError::Validation(format!(
                "lease seconds {secs} exceeds the maximum of {}",
                self.max_lease_secs
            )));
        }
        Ok(Duration::from_secs(secs))
    }
}

fn require_agent(agent_id: &str) -> Result<(), CourierError> {
    if agent_id.trim().is_empty() {
        return Err(CourierError::Validation("agent id is required".into()));
    }
    Ok(())
}
