// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite message and receipt store for the Courier delivery engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, tokio-rusqlite's
//! single-writer connection model, directory tables for topics and groups,
//! and the conditional-write lease transitions behind claim, ack, nack, and
//! renew.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteStore;
pub use database::Database;
pub use models::encode_ts;
