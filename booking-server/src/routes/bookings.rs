//! Booking endpoints: standard, priority, payment return and staff review

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use booking_core::availability::is_offered;
use booking_core::booking::BookingRequest;
use booking_core::{Booking, PaymentMethod, PaymentStatus, TimeWindow};
use chrono::{Local, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use super::availability::load_range;
use super::notifications::{join_warnings, record_notification};
use super::session::{require_admin, require_admin_csrf};
use crate::crypto::generate_id;
use crate::email::{templates, EmailSender};
use crate::error::ApiError;
use crate::outbox;
use crate::payment::{CheckoutRequest, PaymentGateway, SESSION_ID_PLACEHOLDER};
use crate::state::AppState;
use crate::store::{BookingFilter, DataStore, NotificationKind, SessionStore, TempBookingData};

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    #[serde(flatten)]
    pub booking: BookingRequest,
    pub payment_method: PaymentMethod,
}

#[derive(Deserialize)]
pub struct PriorityBookingRequest {
    pub date: NaiveDate,
    #[serde(default, with = "booking_core::time_format::option")]
    pub start_time: Option<NaiveTime>,
    pub topic: String,
    pub customer_name: String,
    pub email: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "default_priority_method")]
    pub payment_method: PaymentMethod,
}

fn default_priority_method() -> PaymentMethod {
    PaymentMethod::Transfer
}

#[derive(Deserialize)]
pub struct PaymentSuccessQuery {
    pub session_id: String,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Serialize)]
pub struct BookingResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking: Option<Booking>,
    /// Set for card payments: where the client continues
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Serialize)]
pub struct BookingsResponse {
    pub success: bool,
    pub bookings: Vec<Booking>,
}

#[derive(Serialize)]
pub struct EarliestPriorityResponse {
    pub success: bool,
    pub earliest_date: NaiveDate,
    pub price_cents: i64,
}

/// Staff alert plus client acknowledgement for a new booking
fn announce_booking<D, E>(
    store: &D,
    sender: &E,
    staff_email: Option<&str>,
    booking: &Booking,
    kind: NotificationKind,
) -> Option<String>
where
    D: DataStore + ?Sized,
    E: EmailSender + ?Sized,
{
    let title = match kind {
        NotificationKind::PriorityBooking => "Nouvelle réservation prioritaire",
        NotificationKind::BookingPaid => "Réservation payée",
        _ => "Nouvelle réservation",
    };
    let notification_warning = record_notification(
        store,
        kind,
        title,
        format!(
            "{} le {} à {}",
            booking.customer_name,
            booking.date.format("%d/%m/%Y"),
            booking_core::time_format::format_time(&booking.start_time)
        ),
        Some(booking.id.clone()),
        None,
    );

    let mut emails = vec![templates::booking_received(booking)];
    if let Some(staff) = staff_email {
        emails.push(templates::staff_booking_alert(booking, staff));
    }
    let email_warning = outbox::dispatch_all(store, sender, emails);

    join_warnings([notification_warning, email_warning])
}

/// POST /api/bookings
///
/// Card payments get a payment session and a redirect; the booking is
/// created when the client comes back. Transfers are booked at once.
pub async fn create_booking<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Json<BookingResponse>, ApiError>
where
    D: DataStore + 'static,
    S: SessionStore + 'static,
    E: EmailSender + 'static,
    P: PaymentGateway + 'static,
{
    let request = req.booking;
    request.validate()?;

    let (slots, bookings) = load_range(state.store.as_ref(), request.date, request.date)?;
    let window = TimeWindow::new(request.start_time, request.end_time);
    if !is_offered(request.date, &window, &slots, &bookings, state.settings.occupancy) {
        return Err(ApiError::SlotUnavailable);
    }

    let amount_cents = state.settings.standard_price_cents;

    match req.payment_method {
        PaymentMethod::Card => {
            let checkout = CheckoutRequest {
                booking: request.clone(),
                amount_cents,
                is_priority: false,
                success_url: format!(
                    "{}/api/payments/success?session_id={}",
                    state.settings.public_url, SESSION_ID_PLACEHOLDER
                ),
                cancel_url: format!("{}/booking", state.settings.public_url),
            };

            let payments = state.payments.clone();
            let session = tokio::task::spawn_blocking(move || payments.create_session(&checkout))
                .await
                .map_err(|e| ApiError::Internal(format!("Blocking task failed: {}", e)))?
                .map_err(ApiError::PaymentGateway)?;

            state.store.create_temp_booking(TempBookingData {
                id: generate_id(),
                payment_session_id: session.session_id.clone(),
                request,
                amount_cents,
                created_at: Utc::now(),
            })?;
            tracing::info!(session_id = %session.session_id, "Awaiting card payment");

            Ok(Json(BookingResponse {
                success: true,
                booking: None,
                redirect_url: Some(session.redirect_url),
                warning: None,
            }))
        }
        PaymentMethod::Transfer => {
            let booking = request.into_booking(
                generate_id(),
                PaymentMethod::Transfer,
                amount_cents,
                false,
                Utc::now(),
            );
            state.store.create_booking(&booking)?;
            tracing::info!(booking_id = %booking.id, date = %booking.date, "Created transfer booking");

            let warning = announce_booking(
                state.store.as_ref(),
                state.email_sender.as_ref(),
                state.settings.staff_email.as_deref(),
                &booking,
                NotificationKind::NewBooking,
            );

            Ok(Json(BookingResponse {
                success: true,
                booking: Some(booking),
                redirect_url: None,
                warning,
            }))
        }
    }
}

enum PaidBooking {
    Created(Booking),
    /// A concurrent return for the same session got there first
    Existing(Booking),
}

/// Create the paid booking for a stored card request
fn book_paid_session<D: DataStore + ?Sized>(
    store: &D,
    temp: TempBookingData,
    session_id: &str,
) -> Result<PaidBooking, ApiError> {
    let mut booking = temp.request.into_booking(
        generate_id(),
        PaymentMethod::Card,
        temp.amount_cents,
        false,
        Utc::now(),
    );
    booking.payment_status = booking.payment_status.transition(PaymentStatus::Completed)?;
    booking.payment_session_id = Some(session_id.to_string());

    match store.create_booking(&booking) {
        Ok(()) => {}
        Err(ApiError::SlotAlreadyBooked) => {
            return match store.get_booking_by_payment_session(session_id)? {
                Some(existing) => Ok(PaidBooking::Existing(existing)),
                None => Err(ApiError::SlotAlreadyBooked),
            };
        }
        Err(e) => return Err(e),
    }

    if let Err(e) = store.delete_temp_booking(&temp.id) {
        tracing::warn!(temp_id = %temp.id, error = %e, "Failed to delete temp booking data");
    }
    tracing::info!(booking_id = %booking.id, session_id = %session_id, "Card booking paid");

    Ok(PaidBooking::Created(booking))
}

/// GET /api/payments/success?session_id=
///
/// Turns the stored card booking into a paid booking. Returning twice with
/// the same session yields the same booking, including when two returns race
/// past the initial lookup.
pub async fn payment_success<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    Query(query): Query<PaymentSuccessQuery>,
) -> Result<Json<BookingResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    if let Some(booking) = state.store.get_booking_by_payment_session(&query.session_id)? {
        return Ok(Json(BookingResponse {
            success: true,
            booking: Some(booking),
            redirect_url: None,
            warning: None,
        }));
    }

    let temp = state
        .store
        .get_temp_booking(&query.session_id)?
        .ok_or(ApiError::BookingDataNotFound)?;

    let booking = match book_paid_session(state.store.as_ref(), temp, &query.session_id)? {
        PaidBooking::Created(booking) => booking,
        PaidBooking::Existing(booking) => {
            return Ok(Json(BookingResponse {
                success: true,
                booking: Some(booking),
                redirect_url: None,
                warning: None,
            }));
        }
    };

    let warning = announce_booking(
        state.store.as_ref(),
        state.email_sender.as_ref(),
        state.settings.staff_email.as_deref(),
        &booking,
        NotificationKind::BookingPaid,
    );

    Ok(Json(BookingResponse {
        success: true,
        booking: Some(booking),
        redirect_url: None,
        warning,
    }))
}

/// GET /api/bookings/priority/earliest
pub async fn earliest_priority_date<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
) -> Json<EarliestPriorityResponse>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    Json(EarliestPriorityResponse {
        success: true,
        earliest_date: state
            .settings
            .priority_rule
            .earliest_date(Local::now().naive_local()),
        price_cents: state.settings.priority_price_cents,
    })
}

/// POST /api/bookings/priority
///
/// Skips published slots; only the lead time and overlaps with existing
/// bookings are checked.
pub async fn create_priority_booking<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    Json(req): Json<PriorityBookingRequest>,
) -> Result<Json<BookingResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    let window = state.settings.priority_rule.check(
        Local::now().naive_local(),
        req.date,
        req.start_time,
    )?;

    let request = BookingRequest {
        date: req.date,
        start_time: window.start_time,
        end_time: window.end_time,
        topic: req.topic,
        customer_name: req.customer_name,
        email: req.email,
        message: req.message,
    };
    request.validate()?;

    let (_, bookings) = load_range(state.store.as_ref(), req.date, req.date)?;
    let clashes = bookings
        .iter()
        .any(|b| b.payment_status.holds_slot() && b.window().overlaps(&window));
    if clashes {
        return Err(ApiError::SlotUnavailable);
    }

    let booking = request.into_booking(
        generate_id(),
        req.payment_method,
        state.settings.priority_price_cents,
        true,
        Utc::now(),
    );
    state.store.create_booking(&booking)?;
    tracing::info!(booking_id = %booking.id, date = %booking.date, "Created priority booking");

    let warning = announce_booking(
        state.store.as_ref(),
        state.email_sender.as_ref(),
        state.settings.staff_email.as_deref(),
        &booking,
        NotificationKind::PriorityBooking,
    );

    Ok(Json(BookingResponse {
        success: true,
        booking: Some(booking),
        redirect_url: None,
        warning,
    }))
}

/// GET /api/admin/bookings?status=&from=&to=
pub async fn list_bookings<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
    Query(filter): Query<BookingFilter>,
) -> Result<Json<BookingsResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    require_admin(&cookies, state.session_store.as_ref())?;

    Ok(Json(BookingsResponse {
        success: true,
        bookings: state.store.list_bookings(&filter)?,
    }))
}

/// GET /api/admin/bookings/:id
pub async fn get_booking<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    require_admin(&cookies, state.session_store.as_ref())?;

    let booking = state.store.get_booking(&id)?.ok_or(ApiError::BookingNotFound)?;

    Ok(Json(BookingResponse {
        success: true,
        booking: Some(booking),
        redirect_url: None,
        warning: None,
    }))
}

/// POST /api/admin/bookings/:id/status
pub async fn update_booking_status<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<BookingResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    require_admin_csrf(&cookies, &headers, state.session_store.as_ref())?;

    let next: PaymentStatus = req.status.trim().parse()?;
    let mut booking = state.store.get_booking(&id)?.ok_or(ApiError::BookingNotFound)?;

    let current = booking.payment_status;
    booking.payment_status = current.transition(next)?;
    if booking.payment_status == current {
        // Repeating a terminal status changes nothing and notifies nobody
        return Ok(Json(BookingResponse {
            success: true,
            booking: Some(booking),
            redirect_url: None,
            warning: None,
        }));
    }

    booking.updated_at = Utc::now();
    state.store.update_booking(&booking)?;
    tracing::info!(booking_id = %booking.id, from = %current, to = %next, "Booking status changed");

    let warning = outbox::dispatch(
        state.store.as_ref(),
        state.email_sender.as_ref(),
        templates::booking_status_changed(&booking),
    );

    Ok(Json(BookingResponse {
        success: true,
        booking: Some(booking),
        redirect_url: None,
        warning,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{BookingStore, InMemoryStore};

    fn temp(session_id: &str) -> TempBookingData {
        TempBookingData {
            id: format!("temp-{session_id}"),
            payment_session_id: session_id.to_string(),
            request: BookingRequest {
                date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                topic: "Strategy".to_string(),
                customer_name: "Client".to_string(),
                email: "client@example.com".to_string(),
                message: None,
            },
            amount_cents: 9000,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_paid_session_creates_booking() {
        let store = InMemoryStore::new();
        store.create_temp_booking(temp("cs_1")).unwrap();

        let result = book_paid_session(&store, temp("cs_1"), "cs_1").unwrap();
        let PaidBooking::Created(booking) = result else {
            panic!("expected a new booking");
        };
        assert_eq!(booking.payment_status, PaymentStatus::Completed);
        assert_eq!(booking.payment_session_id.as_deref(), Some("cs_1"));
        assert!(store.get_temp_booking("cs_1").unwrap().is_none());
    }

    #[test]
    fn test_concurrent_return_gets_existing_booking() {
        let store = InMemoryStore::new();
        // First return already created the booking and consumed the temp row
        let winner = match book_paid_session(&store, temp("cs_1"), "cs_1").unwrap() {
            PaidBooking::Created(booking) => booking,
            PaidBooking::Existing(_) => panic!("expected a new booking"),
        };

        let result = book_paid_session(&store, temp("cs_1"), "cs_1").unwrap();
        let PaidBooking::Existing(booking) = result else {
            panic!("expected the existing booking");
        };
        assert_eq!(booking.id, winner.id);
        assert_eq!(store.list_bookings(&BookingFilter::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_slot_taken_by_other_session_conflicts() {
        let store = InMemoryStore::new();
        book_paid_session(&store, temp("cs_1"), "cs_1").unwrap();

        let result = book_paid_session(&store, temp("cs_2"), "cs_2");
        assert!(matches!(result, Err(ApiError::SlotAlreadyBooked)));
    }
}
