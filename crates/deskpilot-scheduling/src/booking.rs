// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Booking execution.
//!
//! Availability is re-checked at booking time: an offer consumed between
//! presentation and selection fails with `SlotTaken` rather than
//! double-booking the organiser.

use std::sync::Arc;

use chrono::Duration;
use deskpilot_config::model::SchedulingConfig;
use deskpilot_core::traits::calendar::{CalendarEvent, EventRequest, TimeWindow};
use deskpilot_core::{CalendarProvider, DeskpilotError, SlotOffer};
use tracing::info;

/// Attendee details attached to the created event.
#[derive(Debug, Clone, Default)]
pub struct Attendee {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Creates calendar events for chosen offers.
pub struct BookingExecutor {
    calendar: Arc<dyn CalendarProvider>,
    config: SchedulingConfig,
}

impl BookingExecutor {
    pub fn new(calendar: Arc<dyn CalendarProvider>, config: SchedulingConfig) -> Self {
        Self { calendar, config }
    }

    /// Books the chosen offer.
    ///
    /// Fails with [`DeskpilotError::SlotTaken`] when the interval (with its
    /// buffer) is no longer free. Calendar write failures surface as
    /// [`DeskpilotError::Calendar`]; the caller escalates rather than
    /// dropping the booking intent.
    pub async fn book(
        &self,
        offer: &SlotOffer,
        attendee: &Attendee,
    ) -> Result<CalendarEvent, DeskpilotError> {
        let buffer = Duration::minutes(self.config.buffer_minutes);
        let slot = TimeWindow::new(offer.start, offer.end);
        let probe = TimeWindow::new(offer.start - buffer, offer.end + buffer);

        let busy = self.calendar.freebusy(probe).await?;
        if busy.iter().any(|b| b.overlaps(&slot)) {
            info!(offer_index = offer.offer_index, "slot consumed before booking");
            return Err(DeskpilotError::SlotTaken {
                offer_index: offer.offer_index,
            });
        }

        let summary = match &attendee.name {
            Some(name) => format!("Product demo with {name}"),
            None => "Product demo".to_string(),
        };
        let event = self
            .calendar
            .create_event(EventRequest {
                summary,
                start: offer.start,
                end: offer.end,
                description: Some("Scheduled through the support assistant.".to_string()),
                attendee_name: attendee.name.clone(),
                attendee_email: attendee.email.clone(),
                organizer_email: self.config.organizer_email.clone(),
            })
            .await?;

        info!(
            event_id = %event.event_id,
            offer_index = offer.offer_index,
            "demo booked"
        );
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    struct ScriptedCalendar {
        busy: Vec<TimeWindow>,
        fail_create: bool,
        created: Mutex<Vec<EventRequest>>,
    }

    #[async_trait]
    impl CalendarProvider for ScriptedCalendar {
        async fn freebusy(&self, _window: TimeWindow) -> Result<Vec<TimeWindow>, DeskpilotError> {
            Ok(self.busy.clone())
        }

        async fn create_event(
            &self,
            request: EventRequest,
        ) -> Result<CalendarEvent, DeskpilotError> {
            if self.fail_create {
                return Err(DeskpilotError::Calendar {
                    message: "write refused".into(),
                    source: None,
                });
            }
            let event = CalendarEvent {
                event_id: "evt-1".into(),
                start: request.start,
                end: request.end,
            };
            self.created.lock().unwrap().push(request);
            Ok(event)
        }
    }

    fn offer() -> SlotOffer {
        let start = Utc.with_ymd_and_hms(2026, 3, 3, 15, 0, 0).unwrap();
        SlotOffer {
            offer_index: 3,
            start,
            end: start + Duration::minutes(30),
            display_timezone: "EST".into(),
        }
    }

    fn executor(busy: Vec<TimeWindow>, fail_create: bool) -> BookingExecutor {
        BookingExecutor::new(
            Arc::new(ScriptedCalendar {
                busy,
                fail_create,
                created: Mutex::new(Vec::new()),
            }),
            SchedulingConfig::default(),
        )
    }

    #[tokio::test]
    async fn booking_free_slot_creates_event() {
        let offer = offer();
        let event = executor(vec![], false)
            .book(
                &offer,
                &Attendee {
                    name: Some("Dana".into()),
                    email: Some("dana@example.com".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(event.start, offer.start);
        assert_eq!(event.end, offer.end);
    }

    #[tokio::test]
    async fn consumed_slot_fails_with_slot_taken() {
        let offer = offer();
        let busy = vec![TimeWindow::new(offer.start, offer.end)];
        let err = executor(busy, false)
            .book(&offer, &Attendee::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DeskpilotError::SlotTaken { offer_index: 3 }));
    }

    #[tokio::test]
    async fn partially_overlapping_busy_also_rejects() {
        let offer = offer();
        let busy = vec![TimeWindow::new(
            offer.start - Duration::minutes(10),
            offer.start + Duration::minutes(5),
        )];
        let err = executor(busy, false)
            .book(&offer, &Attendee::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DeskpilotError::SlotTaken { .. }));
    }

    #[tokio::test]
    async fn organiser_email_is_threaded_onto_events() {
        let calendar = Arc::new(ScriptedCalendar {
            busy: vec![],
            fail_create: false,
            created: Mutex::new(Vec::new()),
        });
        let config = SchedulingConfig {
            organizer_email: Some("host@example.com".into()),
            ..Default::default()
        };
        let executor = BookingExecutor::new(calendar.clone(), config);

        executor.book(&offer(), &Attendee::default()).await.unwrap();

        let created = calendar.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].organizer_email.as_deref(), Some("host@example.com"));
    }

    #[tokio::test]
    async fn calendar_write_failure_surfaces() {
        let err = executor(vec![], true)
            .book(&offer(), &Attendee::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DeskpilotError::Calendar { .. }));
    }
}
