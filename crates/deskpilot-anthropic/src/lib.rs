// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Messages API client implementing the dispatcher's LLM
//! provider contract.

pub mod client;
pub mod types;

pub use client::AnthropicClient;
