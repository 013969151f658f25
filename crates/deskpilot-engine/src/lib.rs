// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversation control plane: the relay hub bridging user surfaces
//! and the agent workspace, and the orchestrator composing classifier,
//! answerer, scheduling, and escalation per session state.

pub mod backoff;
pub mod cancel;
pub mod orchestrator;
pub mod relay;

pub use cancel::CancelRegistry;
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use relay::RelayHub;
