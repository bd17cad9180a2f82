// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Courier coordination hub.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Courier configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CourierConfig {
    /// Hub identity and logging.
    #[serde(default)]
    pub hub: HubConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Lease, batch, and notification settings for the delivery engine.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Expiry sweeper schedule.
    #[serde(default)]
    pub sweeper: SweeperConfig,
}

/// Hub identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HubConfig {
    /// Display name of this hub node.
    #[serde(default = "default_hub_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            name: default_hub_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_hub_name() -> String {
    "courier".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// How long SQLite waits on a locked database before failing, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("courier").join("courier.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("courier.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Delivery engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Lease length used when a claim does not name one.
    #[serde(default = "default_lease_secs")]
    pub default_lease_secs: u64,

    /// Upper bound for any requested lease or renewal.
    #[serde(default = "default_max_lease_secs")]
    pub max_lease_secs: u64,

    /// Largest number of receipts a single claim call may lease.
    #[serde(default = "default_max_claim_batch")]
    pub max_claim_batch: usize,

    /// Capacity of the in-process advisory notification queue.
    #[serde(default = "default_notification_queue_capacity")]
    pub notification_queue_capacity: usize,

    /// Time to live applied to messages sent without one. `None` means no expiry.
    #[serde(default)]
    pub default_ttl_secs: Option<u64>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            default_lease_secs: default_lease_secs(),
            max_lease_secs: default_max_lease_secs(),
            max_claim_batch: default_max_claim_batch(),
            notification_queue_capacity: default_notification_queue_capacity(),
            default_ttl_secs: None,
        }
    }
}

fn default_lease_secs() -> u64 {
    60
}

fn default_max_lease_secs() -> u64 {
    3600
}

fn default_max_claim_batch() -> usize {
    100
}

fn default_notification_queue_capacity() -> usize {
    1024
}

/// Expiry sweeper configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SweeperConfig {
    /// Run the periodic sweeper under `courier serve`.
    #[serde(default = "default_sweeper_enabled")]
    pub enabled: bool,

    /// Seconds between sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: default_sweeper_enabled(),
            interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_sweeper_enabled() -> bool {
    true
}

fn default_sweep_interval_secs() -> u64 {
    60
}
