// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Demo scheduling: slot derivation from calendar free/busy, and booking
//! with re-checked availability.

pub mod booking;
pub mod remote;
pub mod slots;

pub use booking::{Attendee, BookingExecutor};
pub use remote::HttpCalendar;
pub use slots::{format_offer, SlotProvider};
