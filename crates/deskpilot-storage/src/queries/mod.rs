// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules over the serialized connection.

pub mod events;
pub mod sessions;
