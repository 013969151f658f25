// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock calendar provider with scriptable busy intervals.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use deskpilot_core::traits::calendar::{CalendarEvent, EventRequest, TimeWindow};
use deskpilot_core::{CalendarProvider, DeskpilotError};

/// Calendar mock: fixed busy intervals, recorded event creations.
#[derive(Default)]
pub struct MockCalendar {
    busy: Mutex<Vec<TimeWindow>>,
    created: Mutex<Vec<EventRequest>>,
    next_event: AtomicU32,
    failing: AtomicBool,
}

impl MockCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the busy intervals served by `freebusy`.
    pub fn set_busy(&self, busy: Vec<TimeWindow>) {
        *self.busy.lock().unwrap() = busy;
    }

    /// Add one busy interval (e.g. to consume a previously offered slot).
    pub fn add_busy(&self, window: TimeWindow) {
        self.busy.lock().unwrap().push(window);
    }

    /// When set, both freebusy and event creation error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Events created so far.
    pub fn created(&self) -> Vec<EventRequest> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl CalendarProvider for MockCalendar {
    async fn freebusy(&self, _window: TimeWindow) -> Result<Vec<TimeWindow>, DeskpilotError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeskpilotError::Calendar {
                message: "calendar unavailable".into(),
                source: None,
            });
        }
        Ok(self.busy.lock().unwrap().clone())
    }

    async fn create_event(&self, request: EventRequest) -> Result<CalendarEvent, DeskpilotError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeskpilotError::Calendar {
                message: "calendar unavailable".into(),
                source: None,
            });
        }
        let n = self.next_event.fetch_add(1, Ordering::SeqCst) + 1;
        let event = CalendarEvent {
            event_id: format!("evt-{n}"),
            start: request.start,
            end: request.end,
        };
        self.created.lock().unwrap().push(request);
        Ok(event)
    }
}
