// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements issued through one [`Database`] are serialized on
//! tokio-rusqlite's background thread. Several `Database` handles may point
//! at the same file; lease writes stay correct across them because every
//! transition is a conditional UPDATE inside an IMMEDIATE transaction.

use std::path::Path;
use std::time::Duration;

use courier_config::model::StorageConfig;
use courier_core::CourierError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations;

/// Convert a tokio-rusqlite error into `CourierError::Storage`.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> CourierError {
    CourierError::Storage {
        source: Box::new(e),
    }
}

/// Unwrap a domain error raised inside a `call` closure; wrap anything else.
pub(crate) fn map_call_err(e: tokio_rusqlite::Error<CourierError>) -> CourierError {
    match e {
        tokio_rusqlite::Error::Error(inner) => inner,
        other => CourierError::Storage {
            source: Box::new(other),
        },
    }
}

/// Convert a plain rusqlite error into `CourierError::Storage`.
pub(crate) fn sqlite_err(e: rusqlite::Error) -> CourierError {
    CourierError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the delivery database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path` with default storage settings
    /// and apply pending migrations.
    pub async fn open(path: &str) -> Result<Self, CourierError> {
        let config = StorageConfig {
            database_path: path.to_string(),
            ..StorageConfig::default()
        };
        Self::open_with_config(&config).await
    }

    /// Open the database described by `config` and apply pending migrations.
    pub async fn open_with_config(config: &StorageConfig) -> Result<Self, CourierError> {
        if let Some(parent) = Path::new(&config.database_path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| CourierError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = Connection::open(&config.database_path)
            .await
            .map_err(|e| CourierError::Storage {
                source: Box::new(e),
            })?;
        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        Self::prepare(conn, config.wal_mode, busy_timeout).await
    }

    /// Open a private in-memory database. Used by tests.
    pub async fn open_in_memory() -> Result<Self, CourierError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| CourierError::Storage {
                source: Box::new(e),
            })?;
        Self::prepare(conn, false, Duration::from_millis(0)).await
    }

    async fn prepare(
        conn: Connection,
        wal_mode: bool,
        busy_timeout: Duration,
    ) -> Result<Self, CourierError> {
        conn.call(move |conn| -> Result<(), CourierError> {
            if wal_mode {
                conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")
                    .map_err(sqlite_err)?;
            }
            // Receipts are removed with their message through ON DELETE CASCADE.
            conn.execute_batch("PRAGMA foreign_keys = ON;")
                .map_err(sqlite_err)?;
            conn.busy_timeout(busy_timeout).map_err(sqlite_err)?;
            migrations::run_migrations(conn)
        })
        .await
        .map_err(map_call_err)?;

        debug!(wal_mode, "database opened and migrated");
        Ok(Self { conn })
    }

    /// The underlying single-writer connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main database file is self-contained.
    pub async fn close(&self) -> Result<(), CourierError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_schema_and_enables_foreign_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("courier.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();

        let (tables, fk): (i64, i64) = db
            .connection()
            .call(|conn| -> Result<(i64, i64), rusqlite::Error> {
                let tables = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                     AND name IN ('topics', 'subscriptions', 'agent_groups',
                                  'group_members', 'messages', 'receipts')",
                    [],
                    |row| row.get(0),
                )?;
                let fk = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
                Ok((tables, fk))
            })
            .await
            .unwrap();

        assert_eq!(tables, 6);
        assert_eq!(fk, 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn wal_mode_is_applied_to_file_databases() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();

        let mode: String = db
            .connection()
            .call(|conn| -> Result<String, rusqlite::Error> {
                conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn reopening_does_not_rerun_migrations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("twice.db");
        let path = path.to_str().unwrap();

        let first = Database::open(path).await.unwrap();
        first.close().await.unwrap();
        drop(first);

        let second = Database::open(path).await.unwrap();
        let applied: i64 = second
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM refinery_schema_history",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(applied, 1);
    }
}
