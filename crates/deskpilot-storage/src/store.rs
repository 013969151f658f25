// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The session store facade.
//!
//! Single source of truth for conversation state. No other component may
//! hold authoritative state across a request; everything re-reads through
//! here. Optimistic concurrency (CAS on `state`) is the only concurrency
//! primitive at this layer.

use deskpilot_core::types::{
    Session, SessionCounts, SessionMessage, SessionState, SlotOffer, UserKey,
};
use deskpilot_core::DeskpilotError;

use crate::database::Database;
use crate::queries;

pub use crate::queries::sessions::TransitionFields;

/// SQLite-backed session store.
#[derive(Clone)]
pub struct SessionStore {
    db: Database,
}

impl SessionStore {
    /// Opens the store, creating the database and applying migrations.
    pub async fn open(path: &str) -> Result<Self, DeskpilotError> {
        let db = Database::open(path).await?;
        Ok(Self { db })
    }

    /// Checkpoints and closes the underlying database.
    pub async fn close(&self) -> Result<(), DeskpilotError> {
        self.db.close().await
    }

    /// Returns the unique active session for the user, creating one in
    /// `ActiveAi` if none exists. On race, returns the single winner.
    pub async fn find_or_create_active(
        &self,
        user_key: &UserKey,
        channel_key: &str,
    ) -> Result<Session, DeskpilotError> {
        queries::sessions::find_or_create_active(&self.db, user_key, channel_key).await
    }

    /// Appends a message atomically and bumps `updated_at`.
    pub async fn append_message(
        &self,
        session_id: &str,
        message: SessionMessage,
    ) -> Result<Session, DeskpilotError> {
        queries::sessions::append_message(&self.db, session_id, message).await
    }

    /// Appends an AI reply, guarded on the session still being
    /// `ActiveAi`. Returns `None` when the reply was dropped because the
    /// session escalated or closed underneath the generation.
    pub async fn append_ai_message(
        &self,
        session_id: &str,
        message: SessionMessage,
    ) -> Result<Option<Session>, DeskpilotError> {
        queries::sessions::append_ai_message(&self.db, session_id, message).await
    }

    /// Compare-and-set transition; [`DeskpilotError::Stale`] carries the
    /// observed state on failure.
    pub async fn transition(
        &self,
        session_id: &str,
        from: SessionState,
        to: SessionState,
        fields: TransitionFields,
    ) -> Result<Session, DeskpilotError> {
        queries::sessions::transition(&self.db, session_id, from, to, fields).await
    }

    pub async fn set_pending_slots(
        &self,
        session_id: &str,
        offers: &[SlotOffer],
    ) -> Result<Session, DeskpilotError> {
        queries::sessions::set_pending_slots(&self.db, session_id, offers).await
    }

    pub async fn clear_pending_slots(
        &self,
        session_id: &str,
    ) -> Result<Session, DeskpilotError> {
        queries::sessions::clear_pending_slots(&self.db, session_id).await
    }

    pub async fn get(&self, session_id: &str) -> Result<Option<Session>, DeskpilotError> {
        queries::sessions::get(&self.db, session_id).await
    }

    pub async fn get_by_workspace_thread(
        &self,
        workspace_thread_key: &str,
    ) -> Result<Option<Session>, DeskpilotError> {
        queries::sessions::get_by_workspace_thread(&self.db, workspace_thread_key).await
    }

    /// Per-state counts for observability.
    pub async fn stats(&self) -> Result<SessionCounts, DeskpilotError> {
        queries::sessions::stats(&self.db).await
    }

    /// Idempotency check for inbound workspace events; `false` means the
    /// event was already processed and must be a no-op.
    pub async fn record_workspace_event(
        &self,
        workspace_thread_key: &str,
        event_id: &str,
    ) -> Result<bool, DeskpilotError> {
        queries::events::record_workspace_event(&self.db, workspace_thread_key, event_id).await
    }
}
