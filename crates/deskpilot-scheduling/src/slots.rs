// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slot derivation from the calendar provider's free/busy.
//!
//! Business rules: 09:00-17:00 local to the organiser, weekdays only,
//! slots begin on quarter hours, a buffer is kept free around existing
//! events, and a minimum advance window keeps offers out of the immediate
//! future. At most `max_offers` are returned, indexed 1-based in the order
//! presented.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, Duration, FixedOffset, Timelike, Utc};
use deskpilot_config::model::SchedulingConfig;
use deskpilot_core::traits::calendar::TimeWindow;
use deskpilot_core::{CalendarProvider, DeskpilotError, SlotOffer};
use tracing::{debug, info};

/// Derives bookable slots from calendar availability.
pub struct SlotProvider {
    calendar: Arc<dyn CalendarProvider>,
    config: SchedulingConfig,
}

impl SlotProvider {
    pub fn new(calendar: Arc<dyn CalendarProvider>, config: SchedulingConfig) -> Self {
        Self { calendar, config }
    }

    /// The organiser's timezone as a fixed offset.
    pub fn organiser_offset(&self) -> Result<FixedOffset, DeskpilotError> {
        FixedOffset::east_opt(self.config.timezone_offset_minutes * 60).ok_or_else(|| {
            DeskpilotError::Config(format!(
                "invalid timezone offset: {} minutes",
                self.config.timezone_offset_minutes
            ))
        })
    }

    /// Returns the bookable slots starting from `now`, at most
    /// `max_offers`, 1-indexed.
    pub async fn available_slots(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<SlotOffer>, DeskpilotError> {
        let candidates = self.candidate_starts(now)?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let duration = Duration::minutes(self.config.slot_duration_minutes);
        let buffer = Duration::minutes(self.config.buffer_minutes);

        let window = TimeWindow::new(
            candidates[0],
            *candidates.last().unwrap_or(&candidates[0]) + duration,
        );
        let busy = self.calendar.freebusy(window).await?;
        debug!(busy_periods = busy.len(), "freebusy fetched");

        let offers: Vec<SlotOffer> = candidates
            .into_iter()
            .filter(|start| {
                let slot = TimeWindow::new(*start, *start + duration);
                !busy.iter().any(|b| {
                    let buffered = TimeWindow::new(b.start - buffer, b.end + buffer);
                    buffered.overlaps(&slot)
                })
            })
            .take(self.config.max_offers)
            .enumerate()
            .map(|(idx, start)| SlotOffer {
                offer_index: idx as u32 + 1,
                start,
                end: start + duration,
                display_timezone: self.config.timezone_label.clone(),
            })
            .collect();

        info!(offers = offers.len(), "slot derivation complete");
        Ok(offers)
    }

    /// Formats one offer for the user, in the organiser's timezone.
    pub fn describe(&self, offer: &SlotOffer) -> Result<String, DeskpilotError> {
        let offset = self.organiser_offset()?;
        Ok(format_offer(offer, offset))
    }

    /// All quarter-hour starts inside business hours over the lookahead
    /// window, honoring the minimum advance notice.
    fn candidate_starts(&self, now: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>, DeskpilotError> {
        let offset = self.organiser_offset()?;
        let local_now = now.with_timezone(&offset);
        let earliest = now + Duration::hours(self.config.min_advance_hours);
        let duration = Duration::minutes(self.config.slot_duration_minutes);

        // Start today while the business day has meaningful room left,
        // otherwise tomorrow.
        let mut date = if local_now.hour() + 2 < self.config.business_end_hour {
            local_now.date_naive()
        } else {
            local_now.date_naive() + Days::new(1)
        };

        let mut starts = Vec::new();
        let mut business_days = 0u32;
        while business_days < self.config.days_ahead {
            if date.weekday().number_from_monday() <= 5 {
                business_days += 1;
                let mut hour = self.config.business_start_hour;
                let mut minute = 0u32;
                loop {
                    let naive = date
                        .and_hms_opt(hour, minute, 0)
                        .ok_or_else(|| {
                            DeskpilotError::Config(format!("invalid business hour: {hour}"))
                        })?;
                    let Some(local) = naive.and_local_timezone(offset).single() else {
                        break;
                    };
                    let start = local.with_timezone(&Utc);
                    let end_naive = date
                        .and_hms_opt(self.config.business_end_hour, 0, 0)
                        .ok_or_else(|| {
                            DeskpilotError::Config(format!(
                                "invalid business end hour: {}",
                                self.config.business_end_hour
                            ))
                        })?;
                    let Some(day_end) = end_naive.and_local_timezone(offset).single() else {
                        break;
                    };
                    if local + duration > day_end {
                        break;
                    }
                    if start >= earliest {
                        starts.push(start);
                    }
                    // Quarter-hour grid.
                    minute += 15;
                    if minute == 60 {
                        minute = 0;
                        hour += 1;
                    }
                }
            }
            date = date + Days::new(1);
        }

        Ok(starts)
    }
}

/// Renders "Tue Mar 03, 10:00-10:30 EST" for one offer.
pub fn format_offer(offer: &SlotOffer, offset: FixedOffset) -> String {
    let start = offer.start.with_timezone(&offset);
    let end = offer.end.with_timezone(&offset);
    format!(
        "{}, {}-{} {}",
        start.format("%a %b %d"),
        start.format("%H:%M"),
        end.format("%H:%M"),
        offer.display_timezone
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use deskpilot_core::traits::calendar::{CalendarEvent, EventRequest};

    struct FixedCalendar {
        busy: Vec<TimeWindow>,
    }

    #[async_trait]
    impl CalendarProvider for FixedCalendar {
        async fn freebusy(&self, _window: TimeWindow) -> Result<Vec<TimeWindow>, DeskpilotError> {
            Ok(self.busy.clone())
        }

        async fn create_event(
            &self,
            _request: EventRequest,
        ) -> Result<CalendarEvent, DeskpilotError> {
            unreachable!("slot derivation never writes")
        }
    }

    fn config() -> SchedulingConfig {
        SchedulingConfig::default()
    }

    fn provider(busy: Vec<TimeWindow>) -> SlotProvider {
        SlotProvider::new(Arc::new(FixedCalendar { busy }), config())
    }

    /// Monday 2026-03-02 06:00 EST (11:00 UTC).
    fn monday_morning() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 11, 0, 0).unwrap()
    }

    /// EST instant helper.
    fn est(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        FixedOffset::east_opt(-300 * 60)
            .unwrap()
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[tokio::test]
    async fn offers_start_on_quarter_hours_inside_business_day() {
        let offers = provider(vec![]).available_slots(monday_morning()).await.unwrap();
        assert_eq!(offers.len(), 6, "capped at max_offers");
        assert_eq!(offers[0].start, est(2026, 3, 2, 9, 0));
        assert_eq!(offers[1].start, est(2026, 3, 2, 9, 15));
        for offer in &offers {
            let local = offer.start.with_timezone(&FixedOffset::east_opt(-300 * 60).unwrap());
            assert!(local.minute() % 15 == 0);
            assert!(local.hour() >= 9);
            assert_eq!(offer.display_timezone, "EST");
        }
    }

    #[tokio::test]
    async fn offer_indices_are_one_based_and_sequential() {
        let offers = provider(vec![]).available_slots(monday_morning()).await.unwrap();
        let indices: Vec<u32> = offers.iter().map(|o| o.offer_index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn busy_period_excludes_overlapping_and_buffered_slots() {
        // Busy 09:30-10:00 EST. With the 15-minute buffer, slots touching
        // 09:15-10:15 are gone.
        let busy = vec![TimeWindow::new(est(2026, 3, 2, 9, 30), est(2026, 3, 2, 10, 0))];
        let offers = provider(busy).available_slots(monday_morning()).await.unwrap();
        assert_eq!(offers[0].start, est(2026, 3, 2, 10, 15));
    }

    #[tokio::test]
    async fn min_advance_filters_near_slots() {
        // 08:30 EST Monday; with 2h advance the earliest offer is 10:30.
        let now = est(2026, 3, 2, 8, 30);
        let offers = provider(vec![]).available_slots(now).await.unwrap();
        assert_eq!(offers[0].start, est(2026, 3, 2, 10, 30));
    }

    #[tokio::test]
    async fn late_evening_rolls_to_next_business_day() {
        // Friday 2026-03-06 19:00 EST rolls to Monday.
        let friday_evening = est(2026, 3, 6, 19, 0);
        let offers = provider(vec![]).available_slots(friday_evening).await.unwrap();
        let offset = FixedOffset::east_opt(-300 * 60).unwrap();
        let first = offers[0].start.with_timezone(&offset);
        assert_eq!(first.weekday().number_from_monday(), 1, "got {first}");
        assert_eq!(first.date_naive().to_string(), "2026-03-09");
    }

    #[tokio::test]
    async fn weekend_days_are_never_offered() {
        let offers = provider(vec![]).available_slots(monday_morning()).await.unwrap();
        let offset = FixedOffset::east_opt(-300 * 60).unwrap();
        for offer in offers {
            let day = offer.start.with_timezone(&offset).weekday().number_from_monday();
            assert!(day <= 5);
        }
    }

    #[tokio::test]
    async fn last_slot_fits_entirely_before_close() {
        // Fully busy until 16:15; remaining slots must end by 17:00.
        let busy = vec![TimeWindow::new(est(2026, 3, 2, 9, 0), est(2026, 3, 2, 16, 0))];
        let offers = provider(busy).available_slots(monday_morning()).await.unwrap();
        assert!(!offers.is_empty());
        let offset = FixedOffset::east_opt(-300 * 60).unwrap();
        // 16:00 busy end + 15 min buffer pushes the first start to 16:15;
        // 16:30 + 30min = 17:00 is the last legal slot.
        assert_eq!(offers[0].start, est(2026, 3, 2, 16, 15));
        for offer in &offers {
            assert!(offer.end.with_timezone(&offset).hour() <= 17);
        }
    }

    #[test]
    fn format_offer_shows_organiser_local_time() {
        let offset = FixedOffset::east_opt(-300 * 60).unwrap();
        let offer = SlotOffer {
            offer_index: 1,
            start: est(2026, 3, 3, 10, 0),
            end: est(2026, 3, 3, 10, 30),
            display_timezone: "EST".into(),
        };
        assert_eq!(format_offer(&offer, offset), "Tue Mar 03, 10:00-10:30 EST");
    }
}
