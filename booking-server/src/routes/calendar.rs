//! Month and week calendar views

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use booking_core::availability::resolve_with_bookings;
use booking_core::calendar::{month_grid, week_grid, MONTH_GRID_CELLS};
use booking_core::{MonthCell, WeekGrid};
use chrono::{Datelike, Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use super::availability::load_range;
use super::session::require_admin;
use crate::email::EmailSender;
use crate::error::ApiError;
use crate::payment::PaymentGateway;
use crate::state::AppState;
use crate::store::{BookingFilter, DataStore, SessionStore};

#[derive(Deserialize)]
pub struct MonthQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Deserialize)]
pub struct WeekQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct MonthResponse {
    pub success: bool,
    pub year: i32,
    pub month: u32,
    pub cells: Vec<MonthCell>,
}

#[derive(Serialize)]
pub struct WeekResponse {
    pub success: bool,
    #[serde(flatten)]
    pub week: WeekGrid,
}

/// Resolve the requested month, defaulting to the current one
fn month_bounds(query: &MonthQuery, today: NaiveDate) -> Result<(i32, u32, NaiveDate, NaiveDate), ApiError> {
    let year = query.year.unwrap_or(today.year());
    let month = query.month.unwrap_or(today.month());
    let invalid = || ApiError::ValidationError(format!("Invalid month {year}-{month}"));
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let (grid_start, grid_end) = grid_span(first, MONTH_GRID_CELLS).ok_or_else(invalid)?;
    Ok((year, month, grid_start, grid_end))
}

/// First and last day of a grid of `cells` days starting on the Monday of
/// `date`'s week, or `None` when it leaves the representable date range
fn grid_span(date: NaiveDate, cells: usize) -> Option<(NaiveDate, NaiveDate)> {
    let start = date.checked_sub_days(Days::new(
        u64::from(date.weekday().num_days_from_monday()),
    ))?;
    let end = start.checked_add_days(Days::new(cells as u64 - 1))?;
    Some((start, end))
}

/// GET /api/calendar/month - highlights days with at least one bookable window
pub async fn public_month<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<MonthResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    let today = Local::now().date_naive();
    let (year, month, grid_start, grid_end) = month_bounds(&query, today)?;
    let (slots, bookings) = load_range(state.store.as_ref(), grid_start, grid_end)?;

    let highlighted: HashSet<NaiveDate> = grid_start
        .iter_days()
        .take(MONTH_GRID_CELLS)
        .filter(|date| {
            !resolve_with_bookings(*date, &slots, &bookings, state.settings.occupancy).is_empty()
        })
        .collect();

    let cells = month_grid(year, month, today, &highlighted)
        .ok_or_else(|| ApiError::ValidationError(format!("Invalid month {year}-{month}")))?;

    Ok(Json(MonthResponse {
        success: true,
        year,
        month,
        cells,
    }))
}

/// GET /api/admin/calendar/month - highlights days with bookings
pub async fn admin_month<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
    Query(query): Query<MonthQuery>,
) -> Result<Json<MonthResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    require_admin(&cookies, state.session_store.as_ref())?;

    let today = Local::now().date_naive();
    let (year, month, grid_start, grid_end) = month_bounds(&query, today)?;
    let bookings = state.store.list_bookings(&BookingFilter {
        status: None,
        from: Some(grid_start),
        to: Some(grid_end),
    })?;

    let highlighted: HashSet<NaiveDate> = bookings
        .iter()
        .filter(|b| b.payment_status.holds_slot())
        .map(|b| b.date)
        .collect();

    let cells = month_grid(year, month, today, &highlighted)
        .ok_or_else(|| ApiError::ValidationError(format!("Invalid month {year}-{month}")))?;

    Ok(Json(MonthResponse {
        success: true,
        year,
        month,
        cells,
    }))
}

/// GET /api/admin/calendar/week?date=YYYY-MM-DD
pub async fn admin_week<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
    Query(query): Query<WeekQuery>,
) -> Result<Json<WeekResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    require_admin(&cookies, state.session_store.as_ref())?;

    let today = Local::now().date_naive();
    let reference = query.date.unwrap_or(today);
    let (start, end) = grid_span(reference, 7)
        .ok_or_else(|| ApiError::ValidationError(format!("Invalid week of {reference}")))?;
    let bookings = state.store.list_bookings(&BookingFilter {
        status: None,
        from: Some(start),
        to: Some(end),
    })?;

    Ok(Json(WeekResponse {
        success: true,
        week: week_grid(reference, today, &bookings),
    }))
}
