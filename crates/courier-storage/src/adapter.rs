// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`DeliveryStore`] trait.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use courier_config::model::StorageConfig;
use courier_core::types::{
    ClaimFilter, ClaimedMessage, DeliveryPlan, DeliveryStats, Group, GroupMode, InboxEntry,
    InboxQuery, Message, Receipt, Topic,
};
use courier_core::{AdapterType, CourierError, DeliveryStore, HealthStatus, PluginAdapter};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed delivery store.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules. The
/// database is opened on the first call to [`DeliveryStore::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a store for `config`. Nothing is opened until `initialize`.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already opened database, e.g. an in-memory one in tests.
    pub fn from_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::new_with(Some(db)),
        }
    }

    fn db(&self) -> Result<&Database, CourierError> {
        self.db.get().ok_or_else(|| CourierError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, CourierError> {
        let Ok(db) = self.db() else {
            return Ok(HealthStatus::Unhealthy("not initialized".to_string()));
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CourierError> {
        if let Some(db) = self.db.get() {
            db.close().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl DeliveryStore for SqliteStore {
    async fn initialize(&self) -> Result<(), CourierError> {
        let db = Database::open_with_config(&self.config).await?;
        self.db.set(db).map_err(|_| CourierError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), CourierError> {
        self.db()?.close().await
    }

    // --- Directory ---

    async fn create_topic(&self, id: &str, name: &str) -> Result<Topic, CourierError> {
        queries::directory::create_topic(self.db()?, id, name).await
    }

    async fn get_topic(&self, id: &str) -> Result<Option<Topic>, CourierError> {
        queries::directory::get_topic(self.db()?, id).await
    }

    async fn subscribe(&self, topic_id: &str, agent_id: &str) -> Result<(), CourierError> {
        queries::directory::subscribe(self.db()?, topic_id, agent_id).await
    }

    async fn unsubscribe(&self, topic_id: &str, agent_id: &str) -> Result<bool, CourierError> {
        queries::directory::unsubscribe(self.db()?, topic_id, agent_id).await
    }

    async fn list_subscribers(&self, topic_id: &str) -> Result<Vec<String>, CourierError> {
        queries::directory::list_subscribers(self.db()?, topic_id).await
    }

    async fn create_group(
        &self,
        id: &str,
        name: &str,
        mode: GroupMode,
    ) -> Result<Group, CourierError> {
        queries::directory::create_group(self.db()?, id, name, mode).await
    }

    async fn get_group(&self, id: &str) -> Result<Option<Group>, CourierError> {
        queries::directory::get_group(self.db()?, id).await
    }

    async fn add_member(&self, group_id: &str, agent_id: &str) -> Result<(), CourierError> {
        queries::directory::add_member(self.db()?, group_id, agent_id).await
    }

    async fn remove_member(&self, group_id: &str, agent_id: &str) -> Result<bool, CourierError> {
        queries::directory::remove_member(self.db()?, group_id, agent_id).await
    }

    async fn list_members(&self, group_id: &str) -> Result<Vec<String>, CourierError> {
        queries::directory::list_members(self.db()?, group_id).await
    }

    // --- Messages ---

    async fn create_message(
        &self,
        message: &Message,
        plan: &DeliveryPlan,
    ) -> Result<(), CourierError> {
        queries::messages::create_message(self.db()?, message, plan).await
    }

    async fn get_message(&self, id: &str) -> Result<Option<Message>, CourierError> {
        queries::messages::get_message(self.db()?, id).await
    }

    async fn list_inbox(
        &self,
        agent_id: &str,
        query: &InboxQuery,
    ) -> Result<Vec<InboxEntry>, CourierError> {
        queries::messages::list_inbox(self.db()?, agent_id, query).await
    }

    async fn list_receipts(&self, message_id: &str) -> Result<Vec<Receipt>, CourierError> {
        queries::messages::list_receipts(self.db()?, message_id).await
    }

    async fn list_replies(&self, message_id: &str) -> Result<Vec<Message>, CourierError> {
        queries::messages::list_replies(self.db()?, message_id).await
    }

    // --- Leases ---

    async fn claim(
        &self,
        agent_id: &str,
        limit: usize,
        filter: &ClaimFilter,
        lease: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<ClaimedMessage>, CourierError> {
        queries::leases::claim(self.db()?, agent_id, limit, filter, lease, now).await
    }

    async fn ack(
        &self,
        message_id: &str,
        agent_id: &str,
        token: &str,
        mark_read: bool,
        now: DateTime<Utc>,
    ) -> Result<(), CourierError> {
        queries::leases::ack(self.db()?, message_id, agent_id, token, mark_read, now).await
    }

    async fn nack(
        &self,
        message_id: &str,
        agent_id: &str,
        token: &str,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), CourierError> {
        queries::leases::nack(self.db()?, message_id, agent_id, token, reason, now).await
    }

    async fn renew(
        &self,
        message_id: &str,
        agent_id: &str,
        token: &str,
        lease: Duration,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, CourierError> {
        queries::leases::renew(self.db()?, message_id, agent_id, token, lease, now).await
    }

    // --- Expiry ---

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, CourierError> {
        let deleted = queries::expiry::purge_expired(self.db()?, now).await?;
        if deleted > 0 {
            debug!(deleted, "purged expired messages");
        }
        Ok(deleted)
    }

    async fn delivery_stats(&self, now: DateTime<Utc>) -> Result<DeliveryStats, CourierError> {
        queries::expiry::delivery_stats(self.db()?, now).await
    }
}
