// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound webhook server and the outbound user-surface adapter.
//!
//! Surfaces POST their events here; handlers verify signatures, normalise
//! to canonical events, and dispatch into the engine. The outbound half
//! delivers dispatcher replies to a configured callback URL.

pub mod handlers;
pub mod server;
pub mod surface;

pub use server::{router, start_server, GatewayState, ServerConfig};
pub use surface::HttpUserSurface;
