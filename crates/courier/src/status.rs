// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier status` and `courier purge` command implementations.

use std::io::IsTerminal;

use chrono::Utc;
use courier_config::model::CourierConfig;
use courier_core::{CourierError, DeliveryStats, DeliveryStore};
use courier_delivery::ExpirySweeper;
use serde::Serialize;

use crate::serve::open_store;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub hub: String,
    pub database_path: String,
    #[serde(flatten)]
    pub stats: DeliveryStats,
}

/// Print delivery counters for the configured database.
pub async fn run_status(config: &CourierConfig, json: bool, plain: bool) -> Result<(), CourierError> {
    let store = open_store(config).await?;
    let stats = store.delivery_stats(Utc::now()).await?;

    if json {
        let response = StatusResponse {
            hub: config.hub.name.clone(),
            database_path: config.storage.database_path.clone(),
            stats,
        };
        let rendered = serde_json::to_string_pretty(&response)
            .map_err(|e| CourierError::Internal(format!("failed to render status: {e}")))?;
        println!("{rendered}");
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print!("{}", format_status(&config.hub.name, &stats, use_color));
    }
    Ok(())
}

/// Purge expired messages once and print how many were deleted.
pub async fn run_purge(config: &CourierConfig) -> Result<u64, CourierError> {
    let store = open_store(config).await?;
    let sweeper = ExpirySweeper::new(store, &config.sweeper);
    let deleted = sweeper.purge_expired().await?;
    println!("purged {deleted} expired message(s)");
    Ok(deleted)
}

fn format_status(hub: &str, stats: &DeliveryStats, use_color: bool) -> String {
    let mut out = String::new();
    out.push('\n');
    out.push_str(&format!("  courier status ({hub})\n"));
    out.push_str(&format!("  {}\n", "-".repeat(35)));

    let rows = [
        ("Messages", stats.messages),
        ("Pending", stats.pending),
        ("Leased", stats.leased),
        ("Delivered", stats.delivered),
        ("Read", stats.read),
        ("Expired", stats.expired),
    ];
    for (label, value) in rows {
        let value = if use_color && value > 0 {
            use colored::Colorize;
            value.to_string().bold().to_string()
        } else {
            value.to_string()
        };
        out.push_str(&format!("    {:<10} {value}\n", format!("{label}:")));
    }
    out.push('\n');
    out
}
