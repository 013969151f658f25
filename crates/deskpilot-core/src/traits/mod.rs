// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator contracts.
//!
//! Every external system the dispatcher talks to sits behind one of these
//! traits. Components depend on the traits; only the binary wires concrete
//! implementations.

pub mod calendar;
pub mod provider;
pub mod retrieval;
pub mod surface;
pub mod workspace;

pub use calendar::{CalendarEvent, CalendarProvider, EventRequest, TimeWindow};
pub use provider::{Completion, CompletionRequest, LlmProvider, TokenUsage};
pub use retrieval::{cosine_similarity, ChunkMetadata, Embedder, ScoredChunk, VectorIndex};
pub use surface::UserSurface;
pub use workspace::WorkspaceTransport;
