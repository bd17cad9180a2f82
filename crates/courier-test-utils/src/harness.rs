// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end delivery tests.
//!
//! `TestHarness` assembles the full engine (SQLite store in a temp
//! directory, router, lease coordinator, sweeper, notification queue) with a
//! [`MockBroker`] standing in for live push.

use std::sync::Arc;

use courier_config::model::{CourierConfig, DeliveryConfig, StorageConfig};
use courier_core::{ClaimFilter, ClaimedMessage, CourierError, DeliveryStore, Message};
use courier_delivery::{DeliveryRouter, ExpirySweeper, LeaseCoordinator, NotificationQueue};
use courier_storage::SqliteStore;
use tokio::sync::{Mutex, mpsc};

use crate::mock_broker::MockBroker;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    delivery: DeliveryConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            delivery: DeliveryConfig::default(),
        }
    }

    /// Override the delivery settings (lease bounds, batch size, queue capacity, TTL).
    pub fn with_delivery(mut self, delivery: DeliveryConfig) -> Self {
        self.delivery = delivery;
        self
    }

    /// Set the advisory notification queue capacity.
    pub fn with_notification_capacity(mut self, capacity: usize) -> Self {
        self.delivery.notification_queue_capacity = capacity;
        self
    }

    /// Build the harness, opening a fresh database in a temp directory.
    pub async fn build(self) -> Result<TestHarness, CourierError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| CourierError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let config = CourierConfig {
            storage: StorageConfig {
                database_path: db_path.to_string_lossy().to_string(),
                ..StorageConfig::default()
            },
            delivery: self.delivery,
            ..CourierConfig::default()
        };

        let store = SqliteStore::new(config.storage.clone());
        store.initialize().await?;
        let store: Arc<dyn DeliveryStore> = Arc::new(store);

        let broker = Arc::new(MockBroker::new());
        let (queue, notifications) =
            NotificationQueue::new(config.delivery.notification_queue_capacity);
        let queue = Arc::new(queue);

        let router = DeliveryRouter::new(store.clone(), &config.delivery)
            .with_broker(broker.clone())
            .with_notifications(queue.clone());
        let coordinator = LeaseCoordinator::new(store.clone(), &config.delivery);
        let sweeper = ExpirySweeper::new(store.clone(), &config.sweeper);

        Ok(TestHarness {
            store,
            router: Arc::new(router),
            coordinator: Arc::new(coordinator),
            sweeper,
            broker,
            notification_queue: queue,
            notifications: Mutex::new(notifications),
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete delivery engine over a temp SQLite database.
pub struct TestHarness {
    /// The store (temp DB, removed on drop).
    pub store: Arc<dyn DeliveryStore>,
    pub router: Arc<DeliveryRouter>,
    pub coordinator: Arc<LeaseCoordinator>,
    pub sweeper: ExpirySweeper,
    /// Captures live pushes made by the router.
    pub broker: Arc<MockBroker>,
    /// Sending side of the advisory queue, for the dropped counter.
    pub notification_queue: Arc<NotificationQueue>,
    notifications: Mutex<mpsc::Receiver<Message>>,
    pub config: CourierConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Build a harness with default settings.
    pub async fn new() -> Result<Self, CourierError> {
        Self::builder().build().await
    }

    /// Create a topic and subscribe `agents` to it.
    pub async fn topic(&self, id: &str, agents: &[&str]) -> Result<(), CourierError> {
        self.store.create_topic(id, id).await?;
        for agent in agents {
            self.store.subscribe(id, agent).await?;
        }
        Ok(())
    }

    /// Create a group with `mode` and add `members` to it.
    pub async fn group(
        &self,
        id: &str,
        mode: courier_core::GroupMode,
        members: &[&str],
    ) -> Result<(), CourierError> {
        self.store.create_group(id, id, mode).await?;
        for member in members {
            self.store.add_member(id, member).await?;
        }
        Ok(())
    }

    /// Claim with no filter.
    pub async fn claim(
        &self,
        agent_id: &str,
        limit: usize,
        lease_secs: Option<u64>,
    ) -> Result<Vec<ClaimedMessage>, CourierError> {
        self.coordinator
            .claim(agent_id, limit, &ClaimFilter::default(), lease_secs)
            .await
    }

    /// Drain every notification currently queued.
    pub async fn drain_notifications(&self) -> Vec<Message> {
        let mut rx = self.notifications.lock().await;
        let mut drained = Vec::new();
        while let Ok(message) = rx.try_recv() {
            drained.push(message);
        }
        drained
    }
}
