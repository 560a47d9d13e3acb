//! Published time slots
//!
//! A slot is either recurring (every week on `day_of_week`) or pinned to a
//! `specific_date`. When both are present the specific date wins.

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::availability::TimeWindow;
use crate::{Error, Result};

/// Day-of-week index with Sunday = 0 and Saturday = 6
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// A published time window during which bookings may be requested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: String,
    pub day_of_week: Option<u8>,
    #[serde(with = "crate::time_format")]
    pub start_time: NaiveTime,
    #[serde(with = "crate::time_format")]
    pub end_time: NaiveTime,
    pub is_available: bool,
    pub is_recurring: bool,
    pub specific_date: Option<NaiveDate>,
}

impl TimeSlot {
    /// Whether this slot produces an occurrence on `date`
    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        if let Some(specific) = self.specific_date {
            return specific == date;
        }
        self.is_recurring && self.day_of_week == Some(day_of_week(date))
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }

    /// Apply an edit, re-validating the result
    pub fn apply(&mut self, draft: SlotDraft) -> Result<()> {
        draft.validate()?;
        self.day_of_week = draft.day_of_week;
        self.start_time = draft.start_time;
        self.end_time = draft.end_time;
        self.is_available = draft.is_available;
        self.is_recurring = draft.is_recurring;
        self.specific_date = draft.specific_date;
        Ok(())
    }
}

/// Slot fields as submitted by staff, before an id is assigned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDraft {
    #[serde(default)]
    pub day_of_week: Option<u8>,
    #[serde(with = "crate::time_format")]
    pub start_time: NaiveTime,
    #[serde(with = "crate::time_format")]
    pub end_time: NaiveTime,
    #[serde(default = "default_available")]
    pub is_available: bool,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub specific_date: Option<NaiveDate>,
}

fn default_available() -> bool {
    true
}

impl SlotDraft {
    /// A weekly slot on `day_of_week` (0 = Sunday)
    pub fn recurring(day_of_week: u8, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            day_of_week: Some(day_of_week),
            start_time,
            end_time,
            is_available: true,
            is_recurring: true,
            specific_date: None,
        }
    }

    /// A one-off slot on `date`
    pub fn on_date(date: NaiveDate, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            day_of_week: Some(day_of_week(date)),
            start_time,
            end_time,
            is_available: true,
            is_recurring: false,
            specific_date: Some(date),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_time >= self.end_time {
            return Err(Error::InvalidTimeRange {
                start: crate::time_format::format_time(&self.start_time),
                end: crate::time_format::format_time(&self.end_time),
            });
        }
        if let Some(day) = self.day_of_week {
            if day > 6 {
                return Err(Error::InvalidDayOfWeek(day));
            }
        }
        if self.specific_date.is_none() {
            if !self.is_recurring {
                return Err(Error::InvalidSlot(
                    "a one-off slot needs a specific date".to_string(),
                ));
            }
            if self.day_of_week.is_none() {
                return Err(Error::InvalidSlot(
                    "a recurring slot needs a day of week".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn into_slot(self, id: String) -> Result<TimeSlot> {
        self.validate()?;
        Ok(TimeSlot {
            id,
            day_of_week: self.day_of_week,
            start_time: self.start_time,
            end_time: self.end_time,
            is_available: self.is_available,
            is_recurring: self.is_recurring,
            specific_date: self.specific_date,
        })
    }
}

/// Expand a date range and weekday subset into one-off slot drafts
///
/// Both ends of the range are inclusive. `weekdays` uses the 0 = Sunday
/// convention; an empty subset yields no drafts.
pub fn bulk_drafts(
    from: NaiveDate,
    to: NaiveDate,
    weekdays: &[u8],
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> Result<Vec<SlotDraft>> {
    if from > to {
        return Err(Error::InvalidDateRange { from, to });
    }
    if let Some(&bad) = weekdays.iter().find(|&&d| d > 6) {
        return Err(Error::InvalidDayOfWeek(bad));
    }
    SlotDraft::on_date(from, start_time, end_time).validate()?;

    let drafts: Vec<SlotDraft> = from
        .iter_days()
        .take_while(|d| *d <= to)
        .filter(|d| weekdays.contains(&day_of_week(*d)))
        .map(|d| SlotDraft::on_date(d, start_time, end_time))
        .collect();

    Ok(drafts)
}
