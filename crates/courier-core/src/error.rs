// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Courier delivery engine.

use thiserror::Error;

/// The primary error type used across all Courier adapter traits and engine operations.
#[derive(Debug, Error)]
pub enum CourierError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed request rejected before it reaches storage
    /// (bad addressing, queue flag without a queue group, zero lease seconds).
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced directory entry or message does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Stale, mismatched, expired, or already-resolved lease reference.
    ///
    /// Deliberately carries no detail: callers cannot tell a wrong token from
    /// an expired lease or an earlier ack, and must re-claim.
    #[error("claim not found")]
    ClaimNotFound,

    /// Storage backend errors (database connection, query failure, constraint violation).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Live-push broker errors. The router logs and swallows these.
    #[error("broker error: {message}")]
    Broker {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CourierError {
    /// Shorthand for a [`CourierError::NotFound`].
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Whether the failed call may be retried as-is.
    ///
    /// Only storage failures qualify, and only for idempotent calls. A
    /// `ClaimNotFound` must be answered with a fresh claim, never a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }

    /// Whether this is the uniform lease failure signal.
    pub fn is_claim_not_found(&self) -> bool {
        matches!(self, Self::ClaimNotFound)
    }
}
