//! Calendar projections for the dashboard
//!
//! Pure date arithmetic: month grids of a fixed 42 cells and week views
//! that place bookings on an 08:00-19:00 timeline.

use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use serde::Serialize;

use crate::booking::{Booking, PaymentStatus};

/// Cells in a month grid (six full weeks)
pub const MONTH_GRID_CELLS: usize = 42;
/// Start of the week timeline
pub const DAY_START_HOUR: u32 = 8;
/// End of the week timeline
pub const DAY_END_HOUR: u32 = 19;
/// Smallest bar width, as a fraction of the timeline
pub const MIN_BAR_WIDTH: f64 = 0.02;

const WINDOW_MINUTES: f64 = ((DAY_END_HOUR - DAY_START_HOUR) * 60) as f64;

/// Monday on or before `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Parse ISO dates into a set, skipping anything unparsable
pub fn highlight_set<I, S>(dates: I) -> HashSet<NaiveDate>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    dates
        .into_iter()
        .filter_map(|s| NaiveDate::parse_from_str(s.as_ref().trim(), "%Y-%m-%d").ok())
        .collect()
}

/// One day in a month grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthCell {
    pub date: NaiveDate,
    pub in_month: bool,
    pub is_today: bool,
    pub is_highlighted: bool,
}

/// Six weeks starting on the Monday on or before the 1st of the month
///
/// Returns `None` when `year`/`month` do not name a valid month.
pub fn month_grid(
    year: i32,
    month: u32,
    today: NaiveDate,
    highlighted: &HashSet<NaiveDate>,
) -> Option<Vec<MonthCell>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let start = week_start(first);

    Some(
        start
            .iter_days()
            .take(MONTH_GRID_CELLS)
            .map(|date| MonthCell {
                date,
                in_month: date.year() == year && date.month() == month,
                is_today: date == today,
                is_highlighted: highlighted.contains(&date),
            })
            .collect(),
    )
}

/// A booking placed on the week timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GanttBar {
    pub booking_id: String,
    /// 0 = Monday
    pub day_index: usize,
    pub left: f64,
    pub width: f64,
    pub topic: String,
    pub customer_name: String,
    pub payment_status: PaymentStatus,
    pub is_priority: bool,
}

/// One day column of the week view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekDay {
    pub date: NaiveDate,
    pub is_today: bool,
}

/// The ISO week containing a reference date, with its bookings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekGrid {
    pub days: Vec<WeekDay>,
    pub bars: Vec<GanttBar>,
}

/// Horizontal placement of a window on the 08:00-19:00 timeline
///
/// Width is at least [`MIN_BAR_WIDTH`] and the bar never runs past the
/// right edge.
pub fn bar_position(start: NaiveTime, end: NaiveTime) -> (f64, f64) {
    let day_start = NaiveTime::from_hms_opt(DAY_START_HOUR, 0, 0).unwrap_or_default();
    let offset = (start - day_start).num_minutes() as f64;
    let duration = (end - start).num_minutes() as f64;

    let width = (duration / WINDOW_MINUTES).clamp(MIN_BAR_WIDTH, 1.0);
    let left = (offset / WINDOW_MINUTES).clamp(0.0, 1.0 - width);
    (left, width)
}

/// Week view for the week containing `reference`
pub fn week_grid(reference: NaiveDate, today: NaiveDate, bookings: &[Booking]) -> WeekGrid {
    let start = week_start(reference);
    let days = start
        .iter_days()
        .take(7)
        .map(|date| WeekDay {
            date,
            is_today: date == today,
        })
        .collect();

    let mut bars: Vec<GanttBar> = bookings
        .iter()
        .filter_map(|b| {
            let day_index = (b.date - start).num_days();
            if !(0..7).contains(&day_index) {
                return None;
            }
            let (left, width) = bar_position(b.start_time, b.end_time);
            Some(GanttBar {
                booking_id: b.id.clone(),
                day_index: day_index as usize,
                left,
                width,
                topic: b.topic.clone(),
                customer_name: b.customer_name.clone(),
                payment_status: b.payment_status,
                is_priority: b.is_priority,
            })
        })
        .collect();

    bars.sort_by(|a, b| {
        a.day_index
            .cmp(&b.day_index)
            .then(a.left.total_cmp(&b.left))
    });

    WeekGrid { days, bars }
}
