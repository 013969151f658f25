// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Deskpilot dispatcher.
//!
//! A single [`DeskpilotConfig`] value is loaded at startup and threaded
//! through construction; there are no global configuration singletons.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::DeskpilotConfig;
