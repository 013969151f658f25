// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Deskpilot dispatcher.

use thiserror::Error;

use crate::types::SessionState;

/// The primary error type used across all Deskpilot components.
#[derive(Debug, Error)]
pub enum DeskpilotError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Session store errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// LLM provider errors (API failure, token limits, model not found).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Vector index errors (query failure, dimension mismatch).
    #[error("vector index error: {message}")]
    Vector {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Calendar provider errors (freebusy lookup, event creation).
    #[error("calendar error: {message}")]
    Calendar {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Agent-workspace transport errors (ticket post, card edit, thread reply).
    #[error("workspace error: {message}")]
    Workspace {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// User-surface delivery errors (send_text, send_actions).
    #[error("surface error: {message}")]
    Surface {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Compare-and-set on session state observed a different state.
    ///
    /// Carried by losing claim attempts and any transition raced by
    /// another writer.
    #[error("stale state: expected {expected}, found {actual}")]
    Stale {
        expected: SessionState,
        actual: SessionState,
    },

    /// The chosen slot was consumed between offer and booking.
    #[error("slot {offer_index} is no longer available")]
    SlotTaken { offer_index: u32 },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DeskpilotError {
    /// Returns true when retrying the same call may succeed (rate limits,
    /// transient transport failures). CAS losses and config errors are not
    /// retryable.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DeskpilotError::Provider { .. }
                | DeskpilotError::Vector { .. }
                | DeskpilotError::Calendar { .. }
                | DeskpilotError::Workspace { .. }
                | DeskpilotError::Surface { .. }
                | DeskpilotError::Timeout { .. }
        )
    }
}
