//! Priority (express) booking rule
//!
//! Priority bookings skip the published slots. The only date constraint is
//! a minimum lead time, evaluated per calendar day: the earliest admissible
//! day is the day on which `now + lead time` falls.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::availability::TimeWindow;
use crate::{Error, Result};

/// Minimum notice for a priority booking
pub const MIN_LEAD_HOURS: i64 = 48;
/// Start time used when the client does not pick one
pub const DEFAULT_START: (u32, u32) = (9, 0);
/// Length of a priority consultation
pub const DEFAULT_DURATION_MINUTES: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityRule {
    pub min_lead: Duration,
    pub default_start: NaiveTime,
    pub duration: Duration,
}

impl Default for PriorityRule {
    fn default() -> Self {
        Self {
            min_lead: Duration::hours(MIN_LEAD_HOURS),
            default_start: NaiveTime::from_hms_opt(DEFAULT_START.0, DEFAULT_START.1, 0)
                .unwrap_or_default(),
            duration: Duration::minutes(DEFAULT_DURATION_MINUTES),
        }
    }
}

impl PriorityRule {
    /// First calendar day a priority booking may target
    pub fn earliest_date(&self, now: NaiveDateTime) -> NaiveDate {
        (now + self.min_lead).date()
    }

    pub fn accepts_date(&self, now: NaiveDateTime, date: NaiveDate) -> bool {
        date >= self.earliest_date(now)
    }

    /// Check the lead time and fill in the time window
    ///
    /// Without a start time the default start is used; the end is always
    /// start + duration and must stay within the same day.
    pub fn check(
        &self,
        now: NaiveDateTime,
        date: NaiveDate,
        start_time: Option<NaiveTime>,
    ) -> Result<TimeWindow> {
        if !self.accepts_date(now, date) {
            return Err(Error::LeadTimeTooShort {
                earliest: self.earliest_date(now),
            });
        }

        let start = start_time.unwrap_or(self.default_start);
        let (end, wrapped) = start.overflowing_add_signed(self.duration);
        if wrapped != 0 || end <= start {
            return Err(Error::InvalidTimeRange {
                start: crate::time_format::format_time(&start),
                end: crate::time_format::format_time(&end),
            });
        }

        Ok(TimeWindow::new(start, end))
    }
}
