// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Calendar provider contract for availability and demo booking.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DeskpilotError;

/// A half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// True when the two intervals share any instant.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// Request to create one calendar event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRequest {
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub attendee_name: Option<String>,
    #[serde(default)]
    pub attendee_email: Option<String>,
    #[serde(default)]
    pub organizer_email: Option<String>,
}

/// A created calendar event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub event_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Contract for the calendar backend.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Busy intervals inside `window`, in no particular order.
    async fn freebusy(&self, window: TimeWindow) -> Result<Vec<TimeWindow>, DeskpilotError>;

    /// Creates an event; the provider assigns the id.
    async fn create_event(&self, request: EventRequest) -> Result<CalendarEvent, DeskpilotError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, 0, 0).unwrap()
    }

    #[test]
    fn overlap_detection() {
        let a = TimeWindow::new(at(9), at(10));
        let b = TimeWindow::new(at(9), at(9) + chrono::Duration::minutes(30));
        let c = TimeWindow::new(at(10), at(11));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c), "touching intervals do not overlap");
        assert!(!c.overlaps(&a));
    }
}
