// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite session store for the Deskpilot dispatcher.
//!
//! The store is the single source of truth for session state. Sessions are
//! rows with history and pending offers embedded as JSON arrays; all writes
//! funnel through one serialized connection, and state changes use
//! compare-and-set so racing writers (claim races, late AI replies) resolve
//! to a single winner.

pub mod database;
pub mod migrations;
pub mod queries;
pub mod store;

pub use database::Database;
pub use store::{SessionStore, TransitionFields};
