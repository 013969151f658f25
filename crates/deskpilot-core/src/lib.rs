// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Deskpilot support dispatcher.
//!
//! Provides the domain types (sessions, messages, slot offers, intents),
//! the shared error type, and the collaborator traits every other crate in
//! the workspace builds against. Components depend on this crate and on
//! each other's interfaces only; nothing here depends back on the engine.

pub mod error;
pub mod traits;
pub mod types;

pub use error::DeskpilotError;
pub use types::{
    Intent, Role, Session, SessionCounts, SessionMessage, SessionState, SlotOffer, Surface,
    TicketAction, TicketCard, UserEvent, UserKey, WorkspaceActionEvent, WorkspaceReplyEvent,
};

pub use traits::{
    CalendarProvider, Embedder, LlmProvider, UserSurface, VectorIndex, WorkspaceTransport,
};
