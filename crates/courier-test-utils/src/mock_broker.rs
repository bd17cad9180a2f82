// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock live-push broker for deterministic testing.
//!
//! `MockBroker` implements `LiveBroker`, capturing every publish and direct
//! send for assertions. It can be switched into a failing mode to check that
//! push failures never affect delivery.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use courier_core::traits::adapter::PluginAdapter;
use courier_core::traits::broker::LiveBroker;
use courier_core::types::{AdapterType, HealthStatus, Message};
use courier_core::CourierError;

/// One captured push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Push {
    Topic { topic_id: String, message_id: String },
    Direct { agent_id: String, message_id: String },
}

/// A mock live-push broker for testing.
pub struct MockBroker {
    pushes: Arc<Mutex<Vec<Push>>>,
    failing: AtomicBool,
}

impl MockBroker {
    /// Create a broker that accepts every push.
    pub fn new() -> Self {
        Self {
            pushes: Arc::new(Mutex::new(Vec::new())),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every subsequent push fail (after it has been recorded).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All pushes so far, in order.
    pub async fn pushes(&self) -> Vec<Push> {
        self.pushes.lock().await.clone()
    }

    /// Agents that received a direct push for `message_id`.
    pub async fn direct_recipients(&self, message_id: &str) -> Vec<String> {
        self.pushes
            .lock()
            .await
            .iter()
            .filter_map(|p| match p {
                Push::Direct {
                    agent_id,
                    message_id: id,
                } if id == message_id => Some(agent_id.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn clear(&self) {
        self.pushes.lock().await.clear();
    }

    async fn record(&self, push: Push) -> Result<(), CourierError> {
        self.pushes.lock().await.push(push);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CourierError::Broker {
                message: "mock broker configured to fail".into(),
                source: None,
            });
        }
        Ok(())
    }
}

impl Default for MockBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockBroker {
    fn name(&self) -> &str {
        "mock-broker"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Broker
    }

    async fn health_check(&self) -> Result<HealthStatus, CourierError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CourierError> {
        Ok(())
    }
}

#[async_trait]
impl LiveBroker for MockBroker {
    async fn publish(&self, topic_id: &str, message: &Message) -> Result<(), CourierError> {
        self.record(Push::Topic {
            topic_id: topic_id.to_string(),
            message_id: message.id.clone(),
        })
        .await
    }

    async fn send_direct(&self, agent_id: &str, message: &Message) -> Result<(), CourierError> {
        self.record(Push::Direct {
            agent_id: agent_id.to_string(),
            message_id: message.id.clone(),
        })
        .await
    }
}
