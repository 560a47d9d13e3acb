//! HTTP routes for the booking service

mod applications;
mod availability;
mod bookings;
mod calendar;
mod notifications;
pub mod session;
mod slots;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::email::EmailSender;
use crate::payment::PaymentGateway;
use crate::state::AppState;
use crate::store::{DataStore, SessionStore};

/// Create the router with all routes
pub fn create_router<D, S, E, P>(state: Arc<AppState<D, S, E, P>>) -> Router
where
    D: DataStore + 'static,
    S: SessionStore + 'static,
    E: EmailSender + 'static,
    P: PaymentGateway + 'static,
{
    let public = Router::new()
        .route("/api/availability", get(availability::get_availability))
        .route("/api/calendar/month", get(calendar::public_month))
        .route("/api/bookings", post(bookings::create_booking))
        .route("/api/bookings/priority", post(bookings::create_priority_booking))
        .route(
            "/api/bookings/priority/earliest",
            get(bookings::earliest_priority_date),
        )
        .route("/api/payments/success", get(bookings::payment_success))
        .route("/api/applications", post(applications::submit_application));

    let admin = Router::new()
        .route("/api/admin/login", post(session::login))
        .route("/api/admin/logout", post(session::logout))
        .route("/api/admin/session", get(session::get_session))
        .route(
            "/api/admin/slots",
            get(slots::list_slots).post(slots::create_slot),
        )
        .route("/api/admin/slots/bulk", post(slots::bulk_create_slots))
        .route(
            "/api/admin/slots/:id",
            put(slots::update_slot).delete(slots::delete_slot),
        )
        .route("/api/admin/slots/:id/toggle", post(slots::toggle_slot))
        .route("/api/admin/bookings", get(bookings::list_bookings))
        .route("/api/admin/bookings/:id", get(bookings::get_booking))
        .route(
            "/api/admin/bookings/:id/status",
            post(bookings::update_booking_status),
        )
        .route("/api/admin/calendar/month", get(calendar::admin_month))
        .route("/api/admin/calendar/week", get(calendar::admin_week))
        .route("/api/admin/applications", get(applications::list_applications))
        .route("/api/admin/applications/:id", get(applications::get_application))
        .route(
            "/api/admin/applications/:id/approve",
            post(applications::approve_application),
        )
        .route(
            "/api/admin/applications/:id/reject",
            post(applications::reject_application),
        )
        .route(
            "/api/admin/applications/:id/schedule",
            post(applications::propose_schedule),
        )
        .route(
            "/api/admin/applications/:id/validate",
            post(applications::validate_schedule),
        )
        .route(
            "/api/admin/applications/:id/payment-link",
            post(applications::send_payment_link),
        )
        .route("/api/admin/applications/:id/paid", post(applications::mark_paid))
        .route(
            "/api/admin/applications/:id/sessions/:collection/:index",
            post(applications::update_session),
        )
        .route(
            "/api/admin/applications/:id/progress",
            get(applications::get_progress),
        )
        .route("/api/admin/notifications", get(notifications::list_notifications))
        .route(
            "/api/admin/notifications/:id/read",
            post(notifications::mark_notification_read),
        )
        .route("/api/admin/outbox", get(notifications::list_outbox))
        .route("/api/admin/outbox/flush", post(notifications::flush_outbox));

    public
        .merge(admin)
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
