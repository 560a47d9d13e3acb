//! Public availability endpoint

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use booking_core::availability::resolve_with_bookings;
use booking_core::{Booking, TimeSlot, TimeWindow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::email::EmailSender;
use crate::error::ApiError;
use crate::payment::PaymentGateway;
use crate::state::AppState;
use crate::store::{BookingFilter, DataStore, SessionStore};

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub success: bool,
    pub date: NaiveDate,
    pub windows: Vec<TimeWindow>,
}

/// Slots and bookings needed to resolve a range of days
pub(crate) fn load_range<D: DataStore + ?Sized>(
    store: &D,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<(Vec<TimeSlot>, Vec<Booking>), ApiError> {
    let slots = store.list_slots()?;
    let bookings = store.list_bookings(&BookingFilter {
        status: None,
        from: Some(from),
        to: Some(to),
    })?;
    Ok((slots, bookings))
}

/// GET /api/availability?date=YYYY-MM-DD
pub async fn get_availability<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    let (slots, bookings) = load_range(state.store.as_ref(), query.date, query.date)?;
    let windows = resolve_with_bookings(query.date, &slots, &bookings, state.settings.occupancy);

    tracing::debug!(date = %query.date, windows = windows.len(), "Resolved availability");

    Ok(Json(AvailabilityResponse {
        success: true,
        date: query.date,
        windows,
    }))
}
