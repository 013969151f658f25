// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic mock collaborators and a full-world harness for testing
//! the Deskpilot dispatcher without any network.

pub mod harness;
pub mod mock_calendar;
pub mod mock_provider;
pub mod mock_retrieval;
pub mod mock_surface;
pub mod mock_workspace;

pub use harness::TestHarness;
pub use mock_calendar::MockCalendar;
pub use mock_provider::ScriptedProvider;
pub use mock_retrieval::{CannedEmbedder, CannedIndex};
pub use mock_surface::{RecordedActions, RecordedText, RecordingSurface};
pub use mock_workspace::{RecordedEphemeral, RecordedThreadMessage, RecordingWorkspace};
