// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./deskpilot.toml` > `~/.config/deskpilot/deskpilot.toml`
//! > `/etc/deskpilot/deskpilot.toml` with environment variable overrides via
//! the `DESKPILOT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::DeskpilotConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/deskpilot/deskpilot.toml` (system-wide)
/// 3. `~/.config/deskpilot/deskpilot.toml` (user XDG config)
/// 4. `./deskpilot.toml` (local directory)
/// 5. `DESKPILOT_*` environment variables
pub fn load_config() -> Result<DeskpilotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DeskpilotConfig::default()))
        .merge(Toml::file("/etc/deskpilot/deskpilot.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("deskpilot/deskpilot.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("deskpilot.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config injection.
pub fn load_config_from_str(toml_content: &str) -> Result<DeskpilotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DeskpilotConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<DeskpilotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DeskpilotConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `DESKPILOT_ANTHROPIC_API_KEY` must map
/// to `anthropic.api_key`, not `anthropic.api.key`.
fn env_provider() -> Env {
    Env::prefixed("DESKPILOT_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("anthropic_", "anthropic.", 1)
            .replacen("retrieval_", "retrieval.", 1)
            .replacen("confidence_", "confidence.", 1)
            .replacen("scheduling_", "scheduling.", 1)
            .replacen("timeouts_", "timeouts.", 1)
            .replacen("escalation_", "escalation.", 1)
            .replacen("workspace_", "workspace.", 1)
            .replacen("surface_", "surface.", 1)
            .replacen("calendar_", "calendar.", 1);
        mapped.into()
    })
}
