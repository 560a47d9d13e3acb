//! Availability resolution
//!
//! Combines weekly recurring slots with one-off slots for a single day.
//! Results are recomputed on every call.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::booking::Booking;
use crate::slot::TimeSlot;

/// A start/end pair within a single day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(with = "crate::time_format")]
    pub start_time: NaiveTime,
    #[serde(with = "crate::time_format")]
    pub end_time: NaiveTime,
}

impl TimeWindow {
    pub fn new(start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            start_time,
            end_time,
        }
    }

    /// Half-open overlap: windows that only touch do not overlap
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

/// How existing bookings affect what is offered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupancyPolicy {
    /// Bookings are ignored; a slot stays on offer after being booked
    ShowBooked,
    /// Windows overlapped by a slot-holding booking are withheld
    #[default]
    HideBooked,
}

/// Bookable windows for `date`, ordered by start time
///
/// Bookings are not consulted. Slots that produce the same window are
/// reported once.
pub fn resolve(date: NaiveDate, slots: &[TimeSlot]) -> Vec<TimeWindow> {
    let mut windows: Vec<TimeWindow> = slots
        .iter()
        .filter(|slot| slot.occurs_on(date))
        .filter(|slot| slot.is_available)
        .map(TimeSlot::window)
        .collect();

    windows.sort();
    windows.dedup();
    windows
}

/// Bookable windows for `date`, with existing bookings applied per `policy`
pub fn resolve_with_bookings(
    date: NaiveDate,
    slots: &[TimeSlot],
    bookings: &[Booking],
    policy: OccupancyPolicy,
) -> Vec<TimeWindow> {
    let windows = resolve(date, slots);
    match policy {
        OccupancyPolicy::ShowBooked => windows,
        OccupancyPolicy::HideBooked => {
            let taken: Vec<TimeWindow> = bookings
                .iter()
                .filter(|b| b.date == date && b.payment_status.holds_slot())
                .map(Booking::window)
                .collect();

            windows
                .into_iter()
                .filter(|w| !taken.iter().any(|t| t.overlaps(w)))
                .collect()
        }
    }
}

/// Whether `window` is currently offered on `date`
pub fn is_offered(
    date: NaiveDate,
    window: &TimeWindow,
    slots: &[TimeSlot],
    bookings: &[Booking],
    policy: OccupancyPolicy,
) -> bool {
    resolve_with_bookings(date, slots, bookings, policy).contains(window)
}
