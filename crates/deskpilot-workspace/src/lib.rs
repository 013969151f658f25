// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent-workspace integration: ticket card construction, the HTTP
//! transport, and webhook signature verification.

pub mod signature;
pub mod ticket;
pub mod transport;

pub use ticket::EscalationBuilder;
pub use transport::HttpWorkspaceTransport;
