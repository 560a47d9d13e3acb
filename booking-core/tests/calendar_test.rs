//! Calendar projection tests

use std::collections::HashSet;

use booking_core::booking::{Booking, PaymentMethod, PaymentStatus};
use booking_core::calendar::{highlight_set, month_grid, week_grid, MONTH_GRID_CELLS};
use chrono::{Datelike, NaiveDate, NaiveTime, Utc, Weekday};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn booking(id: &str, date: NaiveDate, start: (u32, u32), end: (u32, u32)) -> Booking {
    Booking {
        id: id.to_string(),
        date,
        start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        topic: "Coaching".to_string(),
        customer_name: "Client".to_string(),
        email: "client@example.com".to_string(),
        message: None,
        payment_status: PaymentStatus::Confirmed,
        is_priority: false,
        payment_method: PaymentMethod::Card,
        amount_cents: 9000,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        user_id: None,
        payment_session_id: None,
    }
}

/// Scenario: June 2024 starts on a Saturday
#[test]
fn test_june_2024_grid_bounds() {
    let grid = month_grid(2024, 6, d(2024, 6, 10), &HashSet::new()).unwrap();
    assert_eq!(grid.len(), MONTH_GRID_CELLS);
    assert_eq!(grid[0].date, d(2024, 5, 27));
    assert_eq!(grid[0].date.weekday(), Weekday::Mon);
    assert_eq!(grid[41].date, d(2024, 7, 7));
    assert!(!grid[0].in_month);
    assert!(grid[5].in_month); // 2024-06-01
}

/// Property: every month of several years yields 42 cells starting on a Monday
#[test]
fn test_grid_always_42_cells() {
    let today = d(2024, 1, 1);
    for year in 2020..=2030 {
        for month in 1..=12 {
            let grid = month_grid(year, month, today, &HashSet::new()).unwrap();
            assert_eq!(grid.len(), 42, "{year}-{month}");
            assert_eq!(grid[0].date.weekday(), Weekday::Mon);
            assert!(grid[0].date <= d(year, month, 1));
            let in_month = grid.iter().filter(|c| c.in_month).count() as u32;
            assert!((28..=31).contains(&in_month));
        }
    }
}

/// Test: February 2021 starts on a Monday and still gets six weeks
#[test]
fn test_grid_fixed_size_even_when_month_fits_in_four_weeks() {
    let grid = month_grid(2021, 2, d(2021, 2, 14), &HashSet::new()).unwrap();
    assert_eq!(grid[0].date, d(2021, 2, 1));
    assert_eq!(grid.len(), 42);
    assert_eq!(grid.iter().filter(|c| c.is_today).count(), 1);
}

/// Test: highlighted dates are flagged
#[test]
fn test_highlights() {
    let highlighted = highlight_set(vec!["2024-06-12".to_string(), "2024-06-12".to_string()]);
    let grid = month_grid(2024, 6, d(2024, 6, 10), &highlighted).unwrap();

    let flagged: Vec<NaiveDate> = grid
        .iter()
        .filter(|c| c.is_highlighted)
        .map(|c| c.date)
        .collect();
    assert_eq!(flagged, vec![d(2024, 6, 12)]);
}

/// Test: week view places bookings by day and time
#[test]
fn test_week_grid_positions() {
    let bookings = vec![
        booking("wed", d(2024, 6, 12), (13, 30), (14, 30)),
        booking("mon", d(2024, 6, 10), (8, 0), (9, 0)),
        booking("next-week", d(2024, 6, 17), (9, 0), (10, 0)),
    ];

    let week = week_grid(d(2024, 6, 13), d(2024, 6, 13), &bookings);
    assert_eq!(week.days.len(), 7);
    assert_eq!(week.days[0].date, d(2024, 6, 10));
    assert_eq!(week.days[6].date, d(2024, 6, 16));
    assert!(week.days[3].is_today);

    assert_eq!(week.bars.len(), 2);
    assert_eq!(week.bars[0].booking_id, "mon");
    assert_eq!(week.bars[0].day_index, 0);
    assert_eq!(week.bars[0].left, 0.0);

    let wed = &week.bars[1];
    assert_eq!(wed.day_index, 2);
    assert!((wed.left - 330.0 / 660.0).abs() < 1e-9);
    assert!((wed.width - 60.0 / 660.0).abs() < 1e-9);
}

/// Test: projection is idempotent
#[test]
fn test_week_grid_idempotent() {
    let bookings = vec![booking("a", d(2024, 6, 11), (10, 0), (11, 0))];
    let first = week_grid(d(2024, 6, 11), d(2024, 6, 1), &bookings);
    let second = week_grid(d(2024, 6, 11), d(2024, 6, 1), &bookings);
    assert_eq!(first, second);
}
